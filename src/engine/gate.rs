//! Execution gate: turns a winning signal into a guarded ledger settlement.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::journal::TradeJournal;
use crate::ledger::Ledger;
use crate::models::{Trade, TradeAction};

/// Why a signal produced no trade this cycle. A normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    InsufficientFunds,
    InsufficientHoldings,
}

/// Terminal outcome of a settlement attempt.
#[derive(Debug, Clone)]
pub enum Settlement {
    Executed(Trade),
    Suppressed(SuppressReason),
}

pub struct ExecutionGate {
    ledger: Arc<Ledger>,
    journal: Arc<TradeJournal>,
    // per-instrument settlement tokens: at most one settlement in flight each
    tokens: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ExecutionGate {
    pub fn new(ledger: Arc<Ledger>, journal: Arc<TradeJournal>) -> Self {
        Self {
            ledger,
            journal,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    async fn token(&self, instrument: &str) -> Arc<Mutex<()>> {
        let mut tokens = self.tokens.lock().await;
        tokens
            .entry(instrument.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Settle a signal for one instrument, holding the instrument's token
    /// across the ledger commit and journal append. The advisory check
    /// short-circuits the common case; the ledger re-validates atomically and
    /// its verdict is the one that counts. The journal is written only after
    /// the ledger commit succeeds, so a journaled trade always exists in the
    /// ledger.
    pub async fn settle(
        &self,
        instrument: &str,
        action: TradeAction,
        price: Decimal,
    ) -> Result<Settlement, EngineError> {
        let token = self.token(instrument).await;
        let _in_flight = token.lock().await;

        let viable = match action {
            TradeAction::Buy => self.ledger.can_afford(price).await?,
            TradeAction::Sell => self.ledger.can_liquidate(instrument).await?,
        };
        if !viable {
            debug!(instrument, action = %action, "signal suppressed by advisory check");
            return Ok(Settlement::Suppressed(suppress_reason(action)));
        }

        match self.ledger.apply_trade(action, instrument, price).await {
            Ok(trade) => {
                self.journal.append(&trade).await?;
                info!(
                    instrument,
                    action = %action,
                    price = %price,
                    trade_id = %trade.id,
                    "settlement executed"
                );
                Ok(Settlement::Executed(trade))
            }
            Err(EngineError::InsufficientFunds { balance, price }) => {
                warn!(
                    instrument,
                    balance = %balance,
                    price = %price,
                    "buy suppressed at commit"
                );
                Ok(Settlement::Suppressed(SuppressReason::InsufficientFunds))
            }
            Err(EngineError::InsufficientHoldings { .. }) => {
                warn!(instrument, "sell suppressed at commit");
                Ok(Settlement::Suppressed(SuppressReason::InsufficientHoldings))
            }
            Err(e) => Err(e),
        }
    }
}

fn suppress_reason(action: TradeAction) -> SuppressReason {
    match action {
        TradeAction::Buy => SuppressReason::InsufficientFunds,
        TradeAction::Sell => SuppressReason::InsufficientHoldings,
    }
}
