//! Price store: latest prices and bounded newest-first history per instrument.
//!
//! Every successful write is announced on the dispatcher channel only after it
//! has landed in the store (write-then-notify), so an evaluation cycle woken
//! by an event always observes the sample that caused it.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::EngineError;
use crate::models::PriceSample;
use crate::store::Store;

fn history_key(instrument: &str) -> String {
    format!("prices:{instrument}")
}

pub struct PriceStore {
    store: Arc<dyn Store>,
    retention: usize,
    notifier: Option<mpsc::UnboundedSender<PriceSample>>,
}

impl PriceStore {
    pub fn new(store: Arc<dyn Store>, retention: usize) -> Self {
        Self {
            store,
            retention,
            notifier: None,
        }
    }

    /// Attach the dispatcher channel; every successful update is announced on
    /// it after the write completes.
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<PriceSample>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Record a new sample, trim history to the retention window, and notify.
    pub async fn update(
        &self,
        instrument: &str,
        price: Decimal,
    ) -> Result<PriceSample, EngineError> {
        if price <= Decimal::ZERO {
            return Err(EngineError::InvalidPrice {
                instrument: instrument.to_string(),
                price,
            });
        }

        let key = history_key(instrument);
        self.store.push_front(&key, price).await?;
        self.store.trim(&key, self.retention).await?;

        let sample = PriceSample::new(instrument, price);
        debug!(instrument, price = %price, "price updated");

        if let Some(notifier) = &self.notifier {
            // a closed receiver just means we are shutting down
            let _ = notifier.send(sample.clone());
        }

        Ok(sample)
    }

    /// Most recent price for `instrument`.
    pub async fn latest(&self, instrument: &str) -> Result<Decimal, EngineError> {
        self.history_at(instrument, 0).await
    }

    /// Price `offset` samples back from the latest (0 = latest).
    pub async fn history_at(
        &self,
        instrument: &str,
        offset: usize,
    ) -> Result<Decimal, EngineError> {
        let entries = self.store.range(&history_key(instrument), offset, 1).await?;
        entries
            .first()
            .copied()
            .ok_or_else(|| EngineError::PriceNotFound {
                instrument: instrument.to_string(),
            })
    }

    /// One consistent newest-first snapshot of the retained history. Every
    /// strategy in an evaluation cycle reads the same snapshot.
    pub async fn window(&self, instrument: &str) -> Result<PriceWindow, EngineError> {
        let prices = self
            .store
            .range(&history_key(instrument), 0, self.retention)
            .await?;
        if prices.is_empty() {
            return Err(EngineError::PriceNotFound {
                instrument: instrument.to_string(),
            });
        }
        Ok(PriceWindow {
            instrument: instrument.to_string(),
            prices,
        })
    }
}

/// Snapshot of one instrument's recent prices, newest first. Strategies
/// evaluate against this, never against the live store.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    instrument: String,
    prices: Vec<Decimal>,
}

impl PriceWindow {
    /// Build a window from newest-first prices. Must be non-empty.
    pub fn new(instrument: impl Into<String>, prices: Vec<Decimal>) -> Self {
        assert!(!prices.is_empty(), "price window must hold at least one sample");
        Self {
            instrument: instrument.into(),
            prices,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn latest(&self) -> Decimal {
        self.prices[0]
    }

    /// Price `offset` samples back, if retained.
    pub fn at(&self, offset: usize) -> Option<Decimal> {
        self.prices.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Arithmetic mean of the newest `n` samples, if that many exist.
    pub fn mean(&self, n: usize) -> Option<Decimal> {
        if n == 0 || self.prices.len() < n {
            return None;
        }
        let sum: Decimal = self.prices[..n].iter().copied().sum();
        Some(sum / Decimal::from(n as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn price_store(retention: usize) -> PriceStore {
        PriceStore::new(Arc::new(MemoryStore::new()), retention)
    }

    #[tokio::test]
    async fn test_update_trims_to_retention() {
        let prices = price_store(5);

        for price in [dec!(95), dec!(96), dec!(97), dec!(98), dec!(99), dec!(101), dec!(102)] {
            prices.update("AAPL", price).await.unwrap();
        }

        let window = prices.window("AAPL").await.unwrap();
        assert_eq!(window.len(), 5);
        assert_eq!(window.latest(), dec!(102));
        assert_eq!(window.at(4), Some(dec!(97)));
        assert_eq!(window.at(5), None);
    }

    #[tokio::test]
    async fn test_latest_and_history_at() {
        let prices = price_store(5);
        prices.update("AAPL", dec!(100)).await.unwrap();
        prices.update("AAPL", dec!(98)).await.unwrap();

        assert_eq!(prices.latest("AAPL").await.unwrap(), dec!(98));
        assert_eq!(prices.history_at("AAPL", 1).await.unwrap(), dec!(100));
        assert!(matches!(
            prices.history_at("AAPL", 2).await,
            Err(EngineError::PriceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_instrument_is_not_found() {
        let prices = price_store(5);
        assert!(matches!(
            prices.latest("MSFT").await,
            Err(EngineError::PriceNotFound { .. })
        ));
        assert!(matches!(
            prices.window("MSFT").await,
            Err(EngineError::PriceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_price() {
        let prices = price_store(5);
        assert!(matches!(
            prices.update("AAPL", dec!(0)).await,
            Err(EngineError::InvalidPrice { .. })
        ));
        assert!(matches!(
            prices.update("AAPL", dec!(-1)).await,
            Err(EngineError::InvalidPrice { .. })
        ));
    }

    #[tokio::test]
    async fn test_notify_follows_write() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let prices = price_store(5).with_notifier(tx);

        prices.update("AAPL", dec!(101)).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.instrument, "AAPL");
        assert_eq!(event.price, dec!(101));
        // the write that caused the event is already visible
        assert_eq!(prices.latest("AAPL").await.unwrap(), dec!(101));
    }

    #[test]
    fn test_window_mean() {
        let window = PriceWindow::new("AAPL", vec![dec!(102), dec!(101), dec!(100)]);
        assert_eq!(window.mean(2), Some(dec!(101.5)));
        assert_eq!(window.mean(3), Some(dec!(101)));
        assert_eq!(window.mean(4), None);
        assert_eq!(window.mean(0), None);
    }
}
