//! SQLite store backend.
//!
//! One `scalars` table for balance/position values and one autoincrement
//! `list_entries` table shared by price history and the trade journal (the
//! newest entry is the highest rowid). The guarded commit runs as a single
//! transaction, so the ledger's conditional debit/credit is atomic on disk.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreError;

use super::{CommitOutcome, Guard, Op, Store, WriteBatch};

/// Durable [`Store`] over a SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and run migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        // One connection: SQLite serializes writers anyway, and this keeps
        // `sqlite::memory:` databases coherent across all queries.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(unavailable)?;

        let store = Self { pool };
        store.migrate().await?;
        debug!(url, "sqlite store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scalars (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS list_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_list_entries_key ON list_entries (key, id)")
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(())
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        reason: e.to_string(),
    }
}

fn is_busy(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db)
            if db.message().contains("locked") || db.message().contains("busy")
    )
}

fn parse_decimal(raw: &str) -> Result<Decimal, StoreError> {
    raw.parse::<Decimal>().map_err(|e| StoreError::Corrupt {
        reason: format!("bad decimal {raw:?}: {e}"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_scalar(&self, key: &str) -> Result<Option<Decimal>, StoreError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM scalars WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        raw.as_deref().map(parse_decimal).transpose()
    }

    async fn set_scalar(&self, key: &str, value: Decimal) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO scalars (key, value) VALUES (?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn push_front(&self, key: &str, value: Decimal) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO list_entries (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value.to_string())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn range(
        &self,
        key: &str,
        offset: usize,
        len: usize,
    ) -> Result<Vec<Decimal>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT value FROM list_entries WHERE key = ? ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(key)
        .bind(len as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.iter().map(|raw| parse_decimal(raw)).collect()
    }

    async fn trim(&self, key: &str, keep: usize) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM list_entries WHERE key = ?1 AND id NOT IN
             (SELECT id FROM list_entries WHERE key = ?1 ORDER BY id DESC LIMIT ?2)",
        )
        .bind(key)
        .bind(keep as i64)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn append_record(&self, key: &str, record: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO list_entries (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(record)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn records(&self, key: &str) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT value FROM list_entries WHERE key = ? ORDER BY id DESC")
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome, StoreError> {
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(e) if is_busy(&e) => return Ok(CommitOutcome::Conflict),
            Err(e) => return Err(unavailable(e)),
        };

        for (index, guard) in batch.guards.iter().enumerate() {
            match guard {
                Guard::ScalarAtLeast { key, min } => {
                    let raw: Option<String> =
                        sqlx::query_scalar("SELECT value FROM scalars WHERE key = ?")
                            .bind(key)
                            .fetch_optional(&mut *tx)
                            .await
                            .map_err(unavailable)?;
                    let current = raw
                        .as_deref()
                        .map(parse_decimal)
                        .transpose()?
                        .unwrap_or(Decimal::ZERO);
                    if current < *min {
                        tx.rollback().await.map_err(unavailable)?;
                        return Ok(CommitOutcome::GuardFailed { index });
                    }
                }
            }
        }

        for op in &batch.ops {
            match op {
                Op::IncrScalar { key, delta } => {
                    let raw: Option<String> =
                        sqlx::query_scalar("SELECT value FROM scalars WHERE key = ?")
                            .bind(key)
                            .fetch_optional(&mut *tx)
                            .await
                            .map_err(unavailable)?;
                    let current = raw
                        .as_deref()
                        .map(parse_decimal)
                        .transpose()?
                        .unwrap_or(Decimal::ZERO);
                    let next = current + *delta;

                    let result = sqlx::query(
                        "INSERT INTO scalars (key, value) VALUES (?, ?)
                         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                    )
                    .bind(key)
                    .bind(next.to_string())
                    .execute(&mut *tx)
                    .await;

                    match result {
                        Ok(_) => {}
                        Err(e) if is_busy(&e) => return Ok(CommitOutcome::Conflict),
                        Err(e) => return Err(unavailable(e)),
                    }
                }
            }
        }

        match tx.commit().await {
            Ok(()) => Ok(CommitOutcome::Committed),
            Err(e) if is_busy(&e) => Ok(CommitOutcome::Conflict),
            Err(e) => Err(unavailable(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_scalar_round_trip() {
        let store = memory_store().await;

        assert_eq!(store.get_scalar("balance").await.unwrap(), None);
        store.set_scalar("balance", dec!(10000)).await.unwrap();
        assert_eq!(
            store.get_scalar("balance").await.unwrap(),
            Some(dec!(10000))
        );

        store.set_scalar("balance", dec!(9900.25)).await.unwrap();
        assert_eq!(
            store.get_scalar("balance").await.unwrap(),
            Some(dec!(9900.25))
        );
    }

    #[tokio::test]
    async fn test_list_range_and_trim() {
        let store = memory_store().await;

        for price in [dec!(97), dec!(98), dec!(99), dec!(101), dec!(102), dec!(103)] {
            store.push_front("prices:AAPL", price).await.unwrap();
        }
        store.trim("prices:AAPL", 5).await.unwrap();

        let window = store.range("prices:AAPL", 0, 10).await.unwrap();
        assert_eq!(
            window,
            vec![dec!(103), dec!(102), dec!(101), dec!(99), dec!(98)]
        );

        let second = store.range("prices:AAPL", 1, 1).await.unwrap();
        assert_eq!(second, vec![dec!(102)]);
    }

    #[tokio::test]
    async fn test_guarded_commit_debits_and_credits() {
        let store = memory_store().await;
        store.set_scalar("balance", dec!(150)).await.unwrap();

        let buy = WriteBatch::new()
            .guard_at_least("balance", dec!(100))
            .incr("balance", dec!(-100))
            .incr("position:AAPL", Decimal::ONE);
        assert_eq!(store.commit(buy).await.unwrap(), CommitOutcome::Committed);

        // second identical buy must fail its guard and change nothing
        let buy = WriteBatch::new()
            .guard_at_least("balance", dec!(100))
            .incr("balance", dec!(-100))
            .incr("position:AAPL", Decimal::ONE);
        assert_eq!(
            store.commit(buy).await.unwrap(),
            CommitOutcome::GuardFailed { index: 0 }
        );

        assert_eq!(store.get_scalar("balance").await.unwrap(), Some(dec!(50)));
        assert_eq!(
            store.get_scalar("position:AAPL").await.unwrap(),
            Some(dec!(1))
        );
    }

    #[tokio::test]
    async fn test_records_newest_first() {
        let store = memory_store().await;
        store.append_record("trades", r#"{"n":1}"#).await.unwrap();
        store.append_record("trades", r#"{"n":2}"#).await.unwrap();

        let records = store.records("trades").await.unwrap();
        assert_eq!(records, vec![r#"{"n":2}"#.to_string(), r#"{"n":1}"#.to_string()]);
    }
}
