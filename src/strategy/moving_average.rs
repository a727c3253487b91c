//! Moving-average crossover strategy.

use crate::market::PriceWindow;
use crate::models::Signal;

use super::Strategy;

/// Compares short and long arithmetic moving averages over the newest
/// samples: short above long reads as upward momentum (buy), short below as
/// downward (sell). Fewer than `long_window` samples is an expected transient
/// state and holds rather than erroring.
#[derive(Debug, Clone)]
pub struct MovingAverageStrategy {
    short_window: usize,
    long_window: usize,
}

impl MovingAverageStrategy {
    pub fn new(short_window: usize, long_window: usize) -> Self {
        Self {
            short_window,
            long_window,
        }
    }
}

impl Strategy for MovingAverageStrategy {
    fn name(&self) -> &'static str {
        "moving_average"
    }

    fn evaluate(&self, window: &PriceWindow) -> Signal {
        let (Some(short), Some(long)) = (
            window.mean(self.short_window),
            window.mean(self.long_window),
        ) else {
            return Signal::Hold;
        };

        if short > long {
            Signal::Buy
        } else if short < long {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_short_above_long_buys() {
        // history newest-first [102, 101, 99, 98, 97]:
        // shortMA ~ 100.67 > longMA = 99.4
        let strategy = MovingAverageStrategy::new(3, 5);
        let window = PriceWindow::new(
            "AAPL",
            vec![dec!(102), dec!(101), dec!(99), dec!(98), dec!(97)],
        );
        assert_eq!(strategy.evaluate(&window), Signal::Buy);
    }

    #[test]
    fn test_short_below_long_sells() {
        let strategy = MovingAverageStrategy::new(3, 5);
        let window = PriceWindow::new(
            "AAPL",
            vec![dec!(97), dec!(98), dec!(99), dec!(101), dec!(102)],
        );
        assert_eq!(strategy.evaluate(&window), Signal::Sell);
    }

    #[test]
    fn test_equal_averages_hold() {
        let strategy = MovingAverageStrategy::new(2, 4);
        let window = PriceWindow::new("AAPL", vec![dec!(100), dec!(100), dec!(100), dec!(100)]);
        assert_eq!(strategy.evaluate(&window), Signal::Hold);
    }

    #[test]
    fn test_insufficient_history_holds() {
        let strategy = MovingAverageStrategy::new(3, 5);
        let window = PriceWindow::new("AAPL", vec![dec!(102), dec!(101), dec!(99), dec!(98)]);
        assert_eq!(strategy.evaluate(&window), Signal::Hold);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let strategy = MovingAverageStrategy::new(3, 5);
        let window = PriceWindow::new(
            "AAPL",
            vec![dec!(102), dec!(101), dec!(99), dec!(98), dec!(97)],
        );
        assert_eq!(strategy.evaluate(&window), strategy.evaluate(&window));
    }
}
