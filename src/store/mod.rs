//! Abstract transactional key-value store.
//!
//! The engine core depends only on this capability contract: scalar get/set,
//! newest-first bounded lists, append-only record logs, and an atomic guarded
//! multi-operation commit. The ledger's settlement path goes exclusively
//! through [`Store::commit`], which re-checks its guards inside the commit so
//! a stale advisory read can never turn into an over-spend.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::StoreError;

/// A condition re-validated inside the atomic commit.
#[derive(Debug, Clone)]
pub enum Guard {
    /// The scalar at `key` (missing reads as zero) must be at least `min`.
    ScalarAtLeast { key: String, min: Decimal },
}

/// A single write within a batch.
#[derive(Debug, Clone)]
pub enum Op {
    /// Add `delta` (possibly negative) to the scalar at `key`.
    IncrScalar { key: String, delta: Decimal },
}

/// A guarded multi-operation write. Either every guard holds at commit time
/// and every op applies, or nothing does.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub guards: Vec<Guard>,
    pub ops: Vec<Op>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard_at_least(mut self, key: impl Into<String>, min: Decimal) -> Self {
        self.guards.push(Guard::ScalarAtLeast {
            key: key.into(),
            min,
        });
        self
    }

    pub fn incr(mut self, key: impl Into<String>, delta: Decimal) -> Self {
        self.ops.push(Op::IncrScalar {
            key: key.into(),
            delta,
        });
        self
    }
}

/// Terminal result of an atomic commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every guard held and every op applied.
    Committed,

    /// The guard at `index` no longer held at commit time; nothing applied.
    GuardFailed { index: usize },

    /// The commit lost a race with a concurrent writer; nothing applied.
    /// Retryable.
    Conflict,
}

/// Capability contract the engine requires of its persistent store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_scalar(&self, key: &str) -> Result<Option<Decimal>, StoreError>;

    async fn set_scalar(&self, key: &str, value: Decimal) -> Result<(), StoreError>;

    /// Prepend to the newest-first list at `key`.
    async fn push_front(&self, key: &str, value: Decimal) -> Result<(), StoreError>;

    /// Read up to `len` list entries starting `offset` back from the newest.
    async fn range(&self, key: &str, offset: usize, len: usize)
        -> Result<Vec<Decimal>, StoreError>;

    /// Drop list entries beyond the newest `keep`.
    async fn trim(&self, key: &str, keep: usize) -> Result<(), StoreError>;

    /// Append an opaque record to the log at `key`.
    async fn append_record(&self, key: &str, record: &str) -> Result<(), StoreError>;

    /// All records at `key`, newest first.
    async fn records(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Atomically apply `batch` iff all of its guards hold at commit time.
    async fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome, StoreError>;
}
