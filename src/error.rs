//! Error taxonomy for the engine core.
//!
//! Insufficient history, funds, or holdings are normal control flow here, not
//! crashes: strategies fall back to holding, and suppressed settlements are
//! surfaced as values. Only storage unavailability propagates as a hard error.

use rust_decimal::Decimal;

/// Failures at the persistent-store boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("atomic commit lost the race twice")]
    Contended,

    #[error("corrupt record in store: {reason}")]
    Corrupt { reason: String },
}

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no price recorded for {instrument}")]
    PriceNotFound { instrument: String },

    #[error("rejected non-positive price {price} for {instrument}")]
    InvalidPrice { instrument: String, price: Decimal },

    #[error("insufficient funds: balance {balance} is below price {price}")]
    InsufficientFunds { balance: Decimal, price: Decimal },

    #[error("no holdings of {instrument} to sell")]
    InsufficientHoldings { instrument: String },

    #[error(transparent)]
    Storage(#[from] StoreError),
}
