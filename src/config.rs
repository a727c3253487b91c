//! Engine configuration. Supplied at startup, immutable thereafter.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Per-strategy thresholds and window sizes. Registration order (and so
/// signal priority) is moving average first, then momentum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Enable the moving-average crossover strategy
    pub moving_average: bool,

    /// Short moving-average window (samples)
    pub ma_short_window: usize,

    /// Long moving-average window (samples)
    pub ma_long_window: usize,

    /// Enable the momentum strategy
    pub momentum: bool,

    /// Relative single-step drop at or below which momentum buys (negative)
    pub momentum_buy_threshold: Decimal,

    /// Relative single-step rise at or above which momentum sells (positive)
    pub momentum_sell_threshold: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            moving_average: true,
            ma_short_window: 3,
            ma_long_window: 5,
            momentum: true,
            momentum_buy_threshold: dec!(-0.02), // buy a 2% dip
            momentum_sell_threshold: dec!(0.03), // sell a 3% pop
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instruments to monitor
    pub instruments: Vec<String>,

    /// Simulated feed tick interval (milliseconds)
    pub tick_interval_ms: u64,

    /// Price-history samples retained per instrument
    pub history_retention: usize,

    /// Starting cash balance, seeded only on a fresh store
    pub starting_balance: Decimal,

    /// Starting quote for the simulated feed
    pub feed_start_price: f64,

    /// Strategy thresholds and windows
    pub strategy: StrategyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instruments: vec!["AAPL".to_string(), "GOOGL".to_string()],
            tick_interval_ms: 5000,
            history_retention: 5,
            starting_balance: dec!(10000),
            feed_start_price: 100.0,
            strategy: StrategyConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Effective history retention: never smaller than what the registered
    /// strategies need (the long MA window; momentum needs two samples).
    pub fn effective_retention(&self) -> usize {
        self.history_retention
            .max(self.strategy.ma_long_window)
            .max(2)
    }
}
