//! Trading strategies: pure decision logic over a price snapshot.

mod momentum;
mod moving_average;

pub use momentum::MomentumStrategy;
pub use moving_average::MovingAverageStrategy;

use std::sync::Arc;

use crate::config::StrategyConfig;
use crate::market::PriceWindow;
use crate::models::Signal;

/// Decision capability. Implementations are pure over the snapshot: the same
/// window always yields the same signal, evaluation never blocks, and
/// strategies hold configuration only, so one instance serves all instruments
/// and all concurrent evaluations.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, window: &PriceWindow) -> Signal;
}

/// Build the enabled strategies in priority order. The dispatcher takes the
/// first non-hold signal, so registration order decides which strategy wins.
pub fn build_strategies(config: &StrategyConfig) -> Vec<Arc<dyn Strategy>> {
    let mut strategies: Vec<Arc<dyn Strategy>> = Vec::new();
    if config.moving_average {
        strategies.push(Arc::new(MovingAverageStrategy::new(
            config.ma_short_window,
            config.ma_long_window,
        )));
    }
    if config.momentum {
        strategies.push(Arc::new(MomentumStrategy::new(
            config.momentum_buy_threshold,
            config.momentum_sell_threshold,
        )));
    }
    strategies
}
