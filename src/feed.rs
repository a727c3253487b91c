//! Simulated upstream price feed.
//!
//! Random-walk quote generator standing in for a real market-data source:
//! each tick, every instrument moves up to +/-1% and the new price is pushed
//! through the price store, which notifies the dispatcher. A real feed would
//! replace this module without the core noticing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::market::PriceStore;

pub struct RandomWalkFeed {
    prices: Arc<PriceStore>,
    tick_interval: Duration,
    // instrument -> current quote; BTreeMap keeps tick order stable
    quotes: BTreeMap<String, f64>,
}

impl RandomWalkFeed {
    pub fn new(
        prices: Arc<PriceStore>,
        instruments: &[String],
        start_price: f64,
        tick_interval: Duration,
    ) -> Self {
        let quotes = instruments
            .iter()
            .map(|symbol| (symbol.clone(), start_price))
            .collect();
        Self {
            prices,
            tick_interval,
            quotes,
        }
    }

    /// Tick every interval until `shutdown` flips.
    pub async fn run(mut self, shutdown: Arc<AtomicBool>) {
        let mut ticker = interval(self.tick_interval);
        while !shutdown.load(Ordering::SeqCst) {
            ticker.tick().await;
            self.tick().await;
        }
        debug!("feed stopped");
    }

    /// One tick: step every quote and push it into the price store.
    pub async fn tick(&mut self) {
        for (instrument, quote) in &mut self.quotes {
            let step = rand::thread_rng().gen_range(-0.01..0.01);
            *quote = (*quote * (1.0 + step)).max(0.01);

            let Some(price) = Decimal::from_f64(*quote).map(|p| p.round_dp(2)) else {
                warn!(instrument = %instrument, quote = *quote, "skipping unrepresentable quote");
                continue;
            };

            if let Err(e) = self.prices.update(instrument, price).await {
                warn!(instrument = %instrument, error = %e, "price update failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_tick_updates_every_instrument() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let prices = Arc::new(PriceStore::new(store, 5));
        let instruments = vec!["AAPL".to_string(), "GOOGL".to_string()];
        let mut feed =
            RandomWalkFeed::new(prices.clone(), &instruments, 100.0, Duration::from_millis(1));

        feed.tick().await;
        feed.tick().await;

        for symbol in &instruments {
            let window = prices.window(symbol).await.unwrap();
            assert_eq!(window.len(), 2);
            assert!(window.latest() > Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn test_quotes_stay_positive() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let prices = Arc::new(PriceStore::new(store, 5));
        let instruments = vec!["AAPL".to_string()];
        // start at the floor: the walk can never step below it
        let mut feed =
            RandomWalkFeed::new(prices.clone(), &instruments, 0.01, Duration::from_millis(1));

        for _ in 0..50 {
            feed.tick().await;
        }

        assert!(prices.latest("AAPL").await.unwrap() > Decimal::ZERO);
    }
}
