//! Append-only trade journal and the derived profit/loss figure.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, StoreError};
use crate::models::Trade;
use crate::store::Store;

const TRADES_KEY: &str = "trades";

pub struct TradeJournal {
    store: Arc<dyn Store>,
}

impl TradeJournal {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append an executed trade. Fails only when the store is unavailable;
    /// the error is surfaced, not retried.
    pub async fn append(&self, trade: &Trade) -> Result<(), EngineError> {
        let record = serde_json::to_string(trade).map_err(|e| StoreError::Corrupt {
            reason: e.to_string(),
        })?;
        self.store.append_record(TRADES_KEY, &record).await?;
        debug!(trade_id = %trade.id, instrument = %trade.instrument, "trade journaled");
        Ok(())
    }

    /// All journaled trades, newest first.
    pub async fn all(&self) -> Result<Vec<Trade>, EngineError> {
        self.store
            .records(TRADES_KEY)
            .await?
            .iter()
            .map(|record| {
                serde_json::from_str(record).map_err(|e| {
                    StoreError::Corrupt {
                        reason: e.to_string(),
                    }
                    .into()
                })
            })
            .collect()
    }

    /// Realized cash flow across all trades: SELLs add `price * quantity`,
    /// BUYs subtract it. Intentionally does not net sells against cost basis;
    /// an open position therefore reads as pure outflow.
    pub async fn profit_loss(&self) -> Result<Decimal, EngineError> {
        Ok(self.all().await?.iter().map(Trade::cash_flow).sum())
    }
}
