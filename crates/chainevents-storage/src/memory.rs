//! In-memory storage backend.
//!
//! Keeps each bucket as a serialized JSON snapshot under a
//! `type:filter:permanence` key, the way a key-value store would, so loads
//! hand back fresh records rather than shared ones.
//! All data is lost when the process exits.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chainevents_core::error::EventStateError;
use chainevents_core::store::BucketStore;
use chainevents_core::types::{Event, Permanence, SubscriptionKey};

struct Snapshot {
    json: String,
    updated_at: i64,
}

/// In-memory bucket storage.
#[derive(Default)]
pub struct InMemoryStorage {
    buckets: Mutex<HashMap<String, Snapshot>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(key: &SubscriptionKey, permanence: Permanence) -> String {
        format!("{key}:{permanence}")
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Snapshot>>, EventStateError> {
        self.buckets
            .lock()
            .map_err(|e| EventStateError::Storage(e.to_string()))
    }

    /// Number of distinct subscriptions with at least one stored bucket.
    pub fn subscription_count(&self) -> Result<usize, EventStateError> {
        let buckets = self.lock()?;
        let subs: BTreeSet<&str> = buckets
            .keys()
            .filter_map(|slot| slot.rsplit_once(':').map(|(sub, _)| sub))
            .collect();
        Ok(subs.len())
    }

    /// Unix timestamp of the last write to a bucket.
    pub fn updated_at(
        &self,
        key: &SubscriptionKey,
        permanence: Permanence,
    ) -> Result<Option<i64>, EventStateError> {
        Ok(self
            .lock()?
            .get(&Self::slot(key, permanence))
            .map(|s| s.updated_at))
    }
}

#[async_trait]
impl BucketStore for InMemoryStorage {
    async fn get_bucket(
        &self,
        key: &SubscriptionKey,
        permanence: Permanence,
    ) -> Result<Option<Vec<Event>>, EventStateError> {
        let buckets = self.lock()?;
        match buckets.get(&Self::slot(key, permanence)) {
            Some(snapshot) => Ok(Some(serde_json::from_str(&snapshot.json)?)),
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
        let snapshot = Snapshot {
            json,
            updated_at: chrono::Utc::now().timestamp(),
        };
        self.lock()?.insert(Self::slot(key, permanence), snapshot);
        Ok(())
    }

    async fn delete(&self, key: &SubscriptionKey) -> Result<(), EventStateError> {
        let mut buckets = self.lock()?;
        for permanence in Permanence::ALL {
            buckets.remove(&Self::slot(key, permanence));
        }
        Ok(())
    }
}
