//! SQLite storage backend for ChainEvents.
//!
//! Persists each subscription's buckets to a single SQLite file, one row per
//! `(stream_type, filter, permanence)` holding the bucket as a JSON array.
//! Uses `sqlx` with WAL mode for concurrent read performance.
//!
//! # Usage
//! ```rust,no_run
//! use chainevents_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./events.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use chainevents_core::error::EventStateError;
use chainevents_core::store::BucketStore;
use chainevents_core::types::{Event, Permanence, SubscriptionKey};

fn storage_err(e: sqlx::Error) -> EventStateError {
    EventStateError::Storage(e.to_string())
}

/// SQLite-backed bucket storage.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./events.db"`) or a full
    /// SQLite URL (`"sqlite:./events.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, EventStateError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Pinned to a single long-lived connection: every new connection to
    /// `sqlite::memory:` would see its own empty database.
    pub async fn in_memory() -> Result<Self, EventStateError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create tables and enable WAL mode.
    async fn init_schema(&self) -> Result<(), EventStateError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS event_buckets (
                stream_type  TEXT    NOT NULL,
                filter       TEXT    NOT NULL,
                permanence   TEXT    NOT NULL,
                events_json  TEXT    NOT NULL,
                event_count  INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL,
                PRIMARY KEY (stream_type, filter, permanence)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    /// Every subscription with at least one stored bucket, sorted.
    pub async fn keys(&self) -> Result<Vec<SubscriptionKey>, EventStateError> {
        let rows = sqlx::query(
            "SELECT DISTINCT stream_type, filter FROM event_buckets
             ORDER BY stream_type, filter",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            let stream_type: String = row.get("stream_type");
            keys.push(SubscriptionKey::new(
                stream_type.parse()?,
                row.get::<String, _>("filter"),
            ));
        }
        Ok(keys)
    }

    /// Stored event count per bucket, without decoding the JSON.
    pub async fn counts(
        &self,
        key: &SubscriptionKey,
    ) -> Result<Vec<(Permanence, u64)>, EventStateError> {
        let rows = sqlx::query(
            "SELECT permanence, event_count FROM event_buckets
             WHERE stream_type = ? AND filter = ?",
        )
        .bind(key.stream_type.as_str())
        .bind(&key.filter)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let permanence: String = row.get("permanence");
            counts.push((permanence.parse()?, row.get::<i64, _>("event_count") as u64));
        }
        Ok(counts)
    }
}

// ─── BucketStore impl ────────────────────────────────────────────────────────

#[async_trait]
impl BucketStore for SqliteStorage {
    async fn get_bucket(
        &self,
        key: &SubscriptionKey,
        permanence: Permanence,
    ) -> Result<Option<Vec<Event>>, EventStateError> {
        let row = sqlx::query(
            "SELECT events_json FROM event_buckets
             WHERE stream_type = ? AND filter = ? AND permanence = ?",
        )
        .bind(key.stream_type.as_str())
        .bind(&key.filter)
        .bind(permanence.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        match row {
            Some(r) => {
                let json: String = r.get("events_json");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn set_bucket(
        &self,
        key: &SubscriptionKey,
        permanence: Permanence,
        events: &[Arc<Event>],
    ) -> Result<(), EventStateError> {
        let records: Vec<&Event> = events.iter().map(|e| &**e).collect();
        let json = serde_json::to_string(&records)?;

        sqlx::query(
            "INSERT OR REPLACE INTO event_buckets
             (stream_type, filter, permanence, events_json, event_count, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(key.stream_type.as_str())
        .bind(&key.filter)
        .bind(permanence.as_str())
        .bind(&json)
        .bind(events.len() as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(subscription = %key, %permanence, events = events.len(), "bucket stored");
        Ok(())
    }

    async fn delete(&self, key: &SubscriptionKey) -> Result<(), EventStateError> {
        sqlx::query("DELETE FROM event_buckets WHERE stream_type = ? AND filter = ?")
            .bind(key.stream_type.as_str())
            .bind(&key.filter)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chainevents_core::types::StreamType;

    fn sample_event(height: u64, id: &str) -> Arc<Event> {
        Arc::new(
            Event::new(
                height,
                format!("rk-{height}"),
                format!("bh-{height}"),
                "coin.TRANSFER",
                id,
            )
            .with_field("params", serde_json::json!(["k:alice", "k:bob", 1.25])),
        )
    }

    fn key() -> SubscriptionKey {
        SubscriptionKey::new(StreamType::Event, "coin.TRANSFER")
    }

    #[tokio::test]
    async fn bucket_roundtrip() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store
            .set_confirmed(&key(), &[sample_event(20, "0"), sample_event(10, "1")])
            .await
            .unwrap();

        let loaded = store.get_confirmed(&key()).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].height, 20);
        assert_eq!(loaded[1].meta.id, "1");
        assert_eq!(loaded[0].extra["params"][0], "k:alice");
    }

    #[tokio::test]
    async fn bucket_upsert() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store.set_unconfirmed(&key(), &[sample_event(1, "0")]).await.unwrap();
        store.set_unconfirmed(&key(), &[]).await.unwrap();

        // Only one row; second save overwrites the first
        let loaded = store.get_unconfirmed(&key()).await.unwrap().unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn missing_bucket_returns_none() {
        let store = SqliteStorage::in_memory().await.unwrap();
        assert!(store.get_orphaned(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keys_counts_and_delete() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let other = SubscriptionKey::new(StreamType::Module, "coin");
        store.set_confirmed(&key(), &[sample_event(1, "0")]).await.unwrap();
        store.set_orphaned(&key(), &[sample_event(2, "0"), sample_event(1, "1")]).await.unwrap();
        store.set_unconfirmed(&other, &[]).await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec![key(), other.clone()]);

        let mut counts = store.counts(&key()).await.unwrap();
        counts.sort_by_key(|(p, _)| p.as_str());
        assert_eq!(counts, vec![(Permanence::Confirmed, 1), (Permanence::Orphaned, 2)]);

        store.delete(&key()).await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec![other]);
    }
}
