//! In-memory store backend for tests and ephemeral runs.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::StoreError;

use super::{CommitOutcome, Guard, Op, Store, WriteBatch};

#[derive(Default)]
struct Inner {
    scalars: HashMap<String, Decimal>,
    // newest-first
    lists: HashMap<String, VecDeque<Decimal>>,
    // append order; read newest-first
    records: HashMap<String, Vec<String>>,
}

/// Fully in-memory [`Store`]. A commit holds the write lock for its whole
/// guard-check-then-apply sequence, so batches are trivially atomic and this
/// backend never reports [`CommitOutcome::Conflict`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_scalar(&self, key: &str) -> Result<Option<Decimal>, StoreError> {
        Ok(self.inner.read().await.scalars.get(key).copied())
    }

    async fn set_scalar(&self, key: &str, value: Decimal) -> Result<(), StoreError> {
        self.inner.write().await.scalars.insert(key.to_string(), value);
        Ok(())
    }

    async fn push_front(&self, key: &str, value: Decimal) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value);
        Ok(())
    }

    async fn range(
        &self,
        key: &str,
        offset: usize,
        len: usize,
    ) -> Result<Vec<Decimal>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .lists
            .get(key)
            .map(|list| list.iter().skip(offset).take(len).copied().collect())
            .unwrap_or_default())
    }

    async fn trim(&self, key: &str, keep: usize) -> Result<(), StoreError> {
        if let Some(list) = self.inner.write().await.lists.get_mut(key) {
            list.truncate(keep);
        }
        Ok(())
    }

    async fn append_record(&self, key: &str, record: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .records
            .entry(key.to_string())
            .or_default()
            .push(record.to_string());
        Ok(())
    }

    async fn records(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .get(key)
            .map(|log| log.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome, StoreError> {
        let mut inner = self.inner.write().await;

        for (index, guard) in batch.guards.iter().enumerate() {
            match guard {
                Guard::ScalarAtLeast { key, min } => {
                    let current = inner.scalars.get(key).copied().unwrap_or(Decimal::ZERO);
                    if current < *min {
                        return Ok(CommitOutcome::GuardFailed { index });
                    }
                }
            }
        }

        for op in &batch.ops {
            match op {
                Op::IncrScalar { key, delta } => {
                    *inner.scalars.entry(key.clone()).or_insert(Decimal::ZERO) += *delta;
                }
            }
        }

        Ok(CommitOutcome::Committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_lists_are_newest_first_and_bounded() {
        let store = MemoryStore::new();

        for price in [dec!(97), dec!(98), dec!(99), dec!(101), dec!(102)] {
            store.push_front("prices:AAPL", price).await.unwrap();
        }
        store.trim("prices:AAPL", 3).await.unwrap();

        let window = store.range("prices:AAPL", 0, 10).await.unwrap();
        assert_eq!(window, vec![dec!(102), dec!(101), dec!(99)]);

        let offset = store.range("prices:AAPL", 1, 1).await.unwrap();
        assert_eq!(offset, vec![dec!(101)]);
    }

    #[tokio::test]
    async fn test_commit_applies_all_ops() {
        let store = MemoryStore::new();
        store.set_scalar("balance", dec!(100)).await.unwrap();

        let batch = WriteBatch::new()
            .guard_at_least("balance", dec!(40))
            .incr("balance", dec!(-40))
            .incr("position:AAPL", Decimal::ONE);

        assert_eq!(store.commit(batch).await.unwrap(), CommitOutcome::Committed);
        assert_eq!(store.get_scalar("balance").await.unwrap(), Some(dec!(60)));
        assert_eq!(
            store.get_scalar("position:AAPL").await.unwrap(),
            Some(dec!(1))
        );
    }

    #[tokio::test]
    async fn test_failed_guard_applies_nothing() {
        let store = MemoryStore::new();
        store.set_scalar("balance", dec!(30)).await.unwrap();

        let batch = WriteBatch::new()
            .guard_at_least("balance", dec!(40))
            .incr("balance", dec!(-40))
            .incr("position:AAPL", Decimal::ONE);

        assert_eq!(
            store.commit(batch).await.unwrap(),
            CommitOutcome::GuardFailed { index: 0 }
        );
        assert_eq!(store.get_scalar("balance").await.unwrap(), Some(dec!(30)));
        assert_eq!(store.get_scalar("position:AAPL").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_scalar_guards_as_zero() {
        let store = MemoryStore::new();

        let batch = WriteBatch::new().guard_at_least("position:AAPL", Decimal::ONE);
        assert_eq!(
            store.commit(batch).await.unwrap(),
            CommitOutcome::GuardFailed { index: 0 }
        );
    }

    #[tokio::test]
    async fn test_records_read_newest_first() {
        let store = MemoryStore::new();
        store.append_record("trades", "first").await.unwrap();
        store.append_record("trades", "second").await.unwrap();

        let records = store.records("trades").await.unwrap();
        assert_eq!(records, vec!["second".to_string(), "first".to_string()]);
    }
}
