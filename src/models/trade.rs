//! Trade model: the immutable record of a settled unit transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settled trade. Immutable once appended to the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier
    pub id: Uuid,

    /// Instrument the trade was settled for
    pub instrument: String,

    /// Trade direction
    pub action: TradeAction,

    /// Settlement price per unit
    pub price: Decimal,

    /// Units traded. Always 1: trades are instantaneous fully-filled unit
    /// transactions.
    pub quantity: u32,

    /// When the ledger commit succeeded
    pub at: DateTime<Utc>,
}

impl Trade {
    pub fn new(instrument: impl Into<String>, action: TradeAction, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument: instrument.into(),
            action,
            price,
            quantity: 1,
            at: Utc::now(),
        }
    }

    /// Signed cash flow of this trade: positive for a SELL, negative for a BUY.
    pub fn cash_flow(&self) -> Decimal {
        let gross = self.price * Decimal::from(self.quantity);
        match self.action {
            TradeAction::Buy => -gross,
            TradeAction::Sell => gross,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cash_flow_signs() {
        let buy = Trade::new("AAPL", TradeAction::Buy, dec!(101.50));
        let sell = Trade::new("AAPL", TradeAction::Sell, dec!(103.25));

        assert_eq!(buy.cash_flow(), dec!(-101.50));
        assert_eq!(sell.cash_flow(), dec!(103.25));
    }

    #[test]
    fn test_trade_round_trips_through_json() {
        let trade = Trade::new("GOOGL", TradeAction::Sell, dec!(99.80));

        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, trade.id);
        assert_eq!(back.action, TradeAction::Sell);
        assert_eq!(back.price, dec!(99.80));
        assert_eq!(back.quantity, 1);
    }
}
