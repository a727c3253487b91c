//! Balance-and-position ledger with atomic conditional settlement.
//!
//! `can_afford` and `can_liquidate` are advisory reads that may be stale by
//! the time a trade commits; the authoritative check is the guard inside
//! [`Ledger::apply_trade`]'s store commit. Concurrent settlements for
//! different instruments against the shared balance linearize there.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{EngineError, StoreError};
use crate::models::{Trade, TradeAction};
use crate::store::{CommitOutcome, Store, WriteBatch};

const BALANCE_KEY: &str = "balance";

fn position_key(instrument: &str) -> String {
    format!("position:{instrument}")
}

pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Seed the balance on a fresh store; resuming keeps the persisted value.
    pub async fn init(&self, starting_balance: Decimal) -> Result<(), EngineError> {
        match self.store.get_scalar(BALANCE_KEY).await? {
            Some(balance) => {
                info!(balance = %balance, "resuming with persisted balance");
            }
            None => {
                self.store.set_scalar(BALANCE_KEY, starting_balance).await?;
                info!(balance = %starting_balance, "seeded starting balance");
            }
        }
        Ok(())
    }

    pub async fn balance(&self) -> Result<Decimal, EngineError> {
        Ok(self
            .store
            .get_scalar(BALANCE_KEY)
            .await?
            .unwrap_or(Decimal::ZERO))
    }

    pub async fn position(&self, instrument: &str) -> Result<Decimal, EngineError> {
        Ok(self
            .store
            .get_scalar(&position_key(instrument))
            .await?
            .unwrap_or(Decimal::ZERO))
    }

    /// Advisory: true iff the balance currently covers `price`.
    pub async fn can_afford(&self, price: Decimal) -> Result<bool, EngineError> {
        Ok(self.balance().await? >= price)
    }

    /// Advisory: true iff at least one unit of `instrument` is held.
    pub async fn can_liquidate(&self, instrument: &str) -> Result<bool, EngineError> {
        Ok(self.position(instrument).await? > Decimal::ZERO)
    }

    /// Atomically settle one unit trade. The affordability/holdings condition
    /// is re-validated inside the commit; on failure, nothing is mutated and
    /// `InsufficientFunds`/`InsufficientHoldings` is returned. A commit that
    /// lost a race is retried once with fresh state before surfacing as
    /// storage-class failure.
    pub async fn apply_trade(
        &self,
        action: TradeAction,
        instrument: &str,
        price: Decimal,
    ) -> Result<Trade, EngineError> {
        let batch = trade_batch(action, instrument, price);

        let outcome = match self.store.commit(batch.clone()).await? {
            CommitOutcome::Conflict => {
                debug!(instrument, "trade commit lost a race, retrying once");
                self.store.commit(batch).await?
            }
            outcome => outcome,
        };

        match outcome {
            CommitOutcome::Committed => {
                let trade = Trade::new(instrument, action, price);
                info!(
                    instrument,
                    action = %action,
                    price = %price,
                    "trade applied to ledger"
                );
                Ok(trade)
            }
            CommitOutcome::GuardFailed { .. } => match action {
                TradeAction::Buy => Err(EngineError::InsufficientFunds {
                    balance: self.balance().await?,
                    price,
                }),
                TradeAction::Sell => Err(EngineError::InsufficientHoldings {
                    instrument: instrument.to_string(),
                }),
            },
            CommitOutcome::Conflict => Err(StoreError::Contended.into()),
        }
    }
}

fn trade_batch(action: TradeAction, instrument: &str, price: Decimal) -> WriteBatch {
    let position = position_key(instrument);
    match action {
        TradeAction::Buy => WriteBatch::new()
            .guard_at_least(BALANCE_KEY, price)
            .incr(BALANCE_KEY, -price)
            .incr(position, Decimal::ONE),
        TradeAction::Sell => WriteBatch::new()
            .guard_at_least(position.clone(), Decimal::ONE)
            .incr(BALANCE_KEY, price)
            .incr(position, -Decimal::ONE),
    }
}
