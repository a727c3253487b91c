//! Single-step momentum strategy.

use rust_decimal::Decimal;

use crate::market::PriceWindow;
use crate::models::Signal;

use super::Strategy;

/// Reacts to the relative change between the latest price and the one before
/// it: a drop at or past `buy_threshold` buys the dip, a rise at or past
/// `sell_threshold` sells into strength. Holds when no usable previous price
/// exists (missing or zero).
#[derive(Debug, Clone)]
pub struct MomentumStrategy {
    buy_threshold: Decimal,
    sell_threshold: Decimal,
}

impl MomentumStrategy {
    pub fn new(buy_threshold: Decimal, sell_threshold: Decimal) -> Self {
        Self {
            buy_threshold,
            sell_threshold,
        }
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn evaluate(&self, window: &PriceWindow) -> Signal {
        let current = window.latest();
        let previous = match window.at(1) {
            Some(previous) if !previous.is_zero() => previous,
            _ => return Signal::Hold,
        };

        let change = (current - previous) / previous;
        if change <= self.buy_threshold {
            Signal::Buy
        } else if change >= self.sell_threshold {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
