//! Data models for prices, signals, and trades.

mod price;
mod signal;
mod trade;

pub use price::PriceSample;
pub use signal::Signal;
pub use trade::{Trade, TradeAction};
