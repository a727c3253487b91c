//! Strategy decision signal.

use super::TradeAction;

/// A strategy's instantaneous decision for one instrument at one evaluation.
/// Ephemeral: signals are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// The settlement action this signal calls for, if any.
    pub fn action(&self) -> Option<TradeAction> {
        match self {
            Signal::Buy => Some(TradeAction::Buy),
            Signal::Sell => Some(TradeAction::Sell),
            Signal::Hold => None,
        }
    }
}
