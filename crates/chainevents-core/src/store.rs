//! Persistence adapter for event buckets.
//!
//! Each subscription persists three buckets. Backends implement the two
//! per-bucket primitives; the named accessors are provided on top.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::EventStateError;
use crate::types::{Event, Permanence, SubscriptionKey};

/// Trait for loading and saving event buckets.
///
/// Implementations include `MemoryBucketStore`, and in `chainevents-storage`
/// `InMemoryStorage` and `SqliteStorage`.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Load one bucket. `None` means nothing was ever stored for it.
    async fn get_bucket(
        &self,
        key: &SubscriptionKey,
        permanence: Permanence,
    ) -> Result<Option<Vec<Event>>, EventStateError>;

    /// Replace one bucket.
    async fn set_bucket(
        &self,
        key: &SubscriptionKey,
        permanence: Permanence,
        events: &[Arc<Event>],
    ) -> Result<(), EventStateError>;

    /// Drop all three buckets of a subscription.
    async fn delete(&self, key: &SubscriptionKey) -> Result<(), EventStateError>;

    async fn get_unconfirmed(
        &self,
        key: &SubscriptionKey,
    ) -> Result<Option<Vec<Event>>, EventStateError> {
        self.get_bucket(key, Permanence::Unconfirmed).await
    }

    async fn get_confirmed(
        &self,
        key: &SubscriptionKey,
    ) -> Result<Option<Vec<Event>>, EventStateError> {
        self.get_bucket(key, Permanence::Confirmed).await
    }

    async fn get_orphaned(
        &self,
        key: &SubscriptionKey,
    ) -> Result<Option<Vec<Event>>, EventStateError> {
        self.get_bucket(key, Permanence::Orphaned).await
    }

    async fn set_unconfirmed(
        &self,
        key: &SubscriptionKey,
        events: &[Arc<Event>],
    ) -> Result<(), EventStateError> {
        self.set_bucket(key, Permanence::Unconfirmed, events).await
    }

    async fn set_confirmed(
        &self,
        key: &SubscriptionKey,
        events: &[Arc<Event>],
    ) -> Result<(), EventStateError> {
        self.set_bucket(key, Permanence::Confirmed, events).await
    }

    async fn set_orphaned(
        &self,
        key: &SubscriptionKey,
        events: &[Arc<Event>],
    ) -> Result<(), EventStateError> {
        self.set_bucket(key, Permanence::Orphaned, events).await
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

type BucketMap = HashMap<(SubscriptionKey, Permanence), Vec<Event>>;

/// In-memory bucket store for tests and ephemeral hosts.
#[derive(Default)]
pub struct MemoryBucketStore {
    data: Mutex<BucketMap>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BucketMap>, EventStateError> {
        self.data
            .lock()
            .map_err(|e| EventStateError::Storage(e.to_string()))
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn get_bucket(
        &self,
        key: &SubscriptionKey,
        permanence: Permanence,
    ) -> Result<Option<Vec<Event>>, EventStateError> {
        Ok(self.lock()?.get(&(key.clone(), permanence)).cloned())
    }

    async fn set_bucket(
        &self,
        key: &SubscriptionKey,
        permanence: Permanence,
        events: &[Arc<Event>],
    ) -> Result<(), EventStateError> {
        let events = events.iter().map(|e| Event::clone(e)).collect();
        self.lock()?.insert((key.clone(), permanence), events);
        Ok(())
    }

    async fn delete(&self, key: &SubscriptionKey) -> Result<(), EventStateError> {
        self.lock()?.retain(|(k, _), _| k != key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamType;

    #[tokio::test]
    async fn named_accessors_hit_their_bucket() {
        let store = MemoryBucketStore::new();
        let key = SubscriptionKey::new(StreamType::Event, "coin.TRANSFER");
        let ev = Arc::new(Event::new(5, "rk", "bh", "coin.TRANSFER", "0"));

        assert!(store.get_confirmed(&key).await.unwrap().is_none());
        store.set_confirmed(&key, &[ev.clone()]).await.unwrap();

        let confirmed = store.get_confirmed(&key).await.unwrap().unwrap();
        assert_eq!(confirmed, vec![Event::clone(&ev)]);
        assert!(store.get_unconfirmed(&key).await.unwrap().is_none());
        assert!(store.get_orphaned(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_only_touches_its_key() {
        let store = MemoryBucketStore::new();
        let a = SubscriptionKey::new(StreamType::Event, "a");
        let b = SubscriptionKey::new(StreamType::Account, "a");
        store.set_unconfirmed(&a, &[]).await.unwrap();
        store.set_orphaned(&b, &[]).await.unwrap();

        store.delete(&a).await.unwrap();
        assert!(store.get_unconfirmed(&a).await.unwrap().is_none());
        assert!(store.get_orphaned(&b).await.unwrap().is_some());
    }
}
