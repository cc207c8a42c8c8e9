//! Event state for a single subscription.
//!
//! Holds the three finality buckets, applies adds/removes coming from the
//! stream service, and answers height-range queries over them.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::bucket::Bucket;
use crate::error::EventStateError;
use crate::logger::EventLogger;
use crate::present::{present, EventQuery};
use crate::store::BucketStore;
use crate::types::{Event, Permanence, SubscriptionKey};

/// Unconfirmed, confirmed and orphaned events of one (type, filter) subscription.
///
/// There is no internal locking: mutations take `&mut self`, so a `save`
/// (which borrows `&self`) cannot overlap an `add` or `remove` on the same
/// instance.
pub struct EventState {
    key: SubscriptionKey,
    store: Arc<dyn BucketStore>,
    logger: Arc<dyn EventLogger>,
    unconfirmed: Bucket,
    confirmed: Bucket,
    orphaned: Bucket,
}

impl EventState {
    pub fn new(
        key: SubscriptionKey,
        store: Arc<dyn BucketStore>,
        logger: Arc<dyn EventLogger>,
    ) -> Self {
        Self {
            key,
            store,
            logger,
            unconfirmed: Bucket::new(),
            confirmed: Bucket::new(),
            orphaned: Bucket::new(),
        }
    }

    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    // ─── Persistence ──────────────────────────────────────────────────────────

    /// Replace all buckets with the persisted ones.
    ///
    /// Buckets that were never stored come back empty.
    pub async fn load(&mut self) -> Result<(), EventStateError> {
        let (unconfirmed, confirmed, orphaned) = futures::try_join!(
            self.store.get_unconfirmed(&self.key),
            self.store.get_confirmed(&self.key),
            self.store.get_orphaned(&self.key),
        )?;
        self.unconfirmed = Bucket::from_events(unconfirmed.unwrap_or_default());
        self.confirmed = Bucket::from_events(confirmed.unwrap_or_default());
        self.orphaned = Bucket::from_events(orphaned.unwrap_or_default());
        debug!(subscription = %self.key, summary = %self.summary(), "event state loaded");
        Ok(())
    }

    /// Write all three buckets to the store.
    pub async fn save(&self) -> Result<(), EventStateError> {
        futures::try_join!(
            self.store.set_confirmed(&self.key, self.confirmed.as_slice()),
            self.store.set_unconfirmed(&self.key, self.unconfirmed.as_slice()),
            self.store.set_orphaned(&self.key, self.orphaned.as_slice()),
        )?;
        debug!(subscription = %self.key, summary = %self.summary(), "event state saved");
        Ok(())
    }

    // ─── Queries ──────────────────────────────────────────────────────────────

    /// `confirmed=<n> unconfirmed=<n> orphaned=<n>`
    pub fn summary(&self) -> String {
        format!(
            "confirmed={} unconfirmed={} orphaned={}",
            self.confirmed.len(),
            self.unconfirmed.len(),
            self.orphaned.len()
        )
    }

    /// Events from every bucket, newest first.
    pub fn get_all_events(&self, query: &EventQuery) -> Vec<Arc<Event>> {
        present(
            &[&self.unconfirmed, &self.confirmed, &self.orphaned],
            query,
            true,
        )
    }

    pub fn get_confirmed_events(&self, query: &EventQuery) -> Vec<Arc<Event>> {
        present(&[&self.confirmed], query, false)
    }

    pub fn get_orphaned_events(&self, query: &EventQuery) -> Vec<Arc<Event>> {
        present(&[&self.orphaned], query, false)
    }

    /// The raw contents of one bucket.
    pub fn bucket(&self, permanence: Permanence) -> &[Arc<Event>] {
        self.bucket_ref(permanence).as_slice()
    }

    pub fn len(&self, permanence: Permanence) -> usize {
        self.bucket_ref(permanence).len()
    }

    /// Returns `true` if all three buckets are empty.
    pub fn is_empty(&self) -> bool {
        Permanence::ALL.iter().all(|p| self.bucket_ref(*p).is_empty())
    }

    /// Returns `true` if an event identical to `needle` is tracked.
    ///
    /// With `Some(permanence)` only that bucket is searched; with `None` the
    /// unconfirmed, confirmed and orphaned buckets are searched in turn.
    pub fn exists(&self, needle: &Event, permanence: Option<Permanence>) -> bool {
        match permanence {
            Some(p) => self.bucket_ref(p).contains(needle),
            None => {
                self.unconfirmed.contains(needle)
                    || self.confirmed.contains(needle)
                    || self.orphaned.contains(needle)
            }
        }
    }

    // ─── Mutations ────────────────────────────────────────────────────────────

    /// Insert `event` into the `permanence` bucket, keeping it sorted.
    ///
    /// Returns `false` (and logs a warning) if an identical event is already
    /// in that bucket.
    pub fn add(&mut self, permanence: Permanence, event: impl Into<Arc<Event>>) -> bool {
        let event = event.into();
        if self.bucket_mut(permanence).insert(Arc::clone(&event)) {
            return true;
        }
        self.logger.warn(&format!(
            "Event {} {} already in {permanence}, not notifying",
            event.request_key, event.name
        ));
        false
    }

    /// Remove the exact record `event` from the `permanence` bucket.
    ///
    /// Records are matched by pointer identity, not content. Returns `false`
    /// (and logs a warning) if the record is not in that bucket.
    pub fn remove(&mut self, permanence: Permanence, event: &Arc<Event>) -> bool {
        if self.bucket_mut(permanence).remove(event) {
            return true;
        }
        self.logger.warn(&format!(
            "Could not find event {} {} in {permanence} while trying to remove it",
            event.name, event.request_key
        ));
        false
    }

    /// Move `event` from one bucket to another.
    ///
    /// Returns `false` and leaves both buckets untouched if `to` already
    /// holds an identical event or `event` is not in `from`. Returns `true`
    /// if the record moved.
    pub fn transition(&mut self, from: Permanence, to: Permanence, event: &Arc<Event>) -> bool {
        if self.bucket_ref(to).contains(event) {
            self.logger.warn(&format!(
                "Event {} {} already in {to}, not moving it from {from}",
                event.request_key, event.name
            ));
            return false;
        }
        self.remove(from, event) && self.add(to, Arc::clone(event))
    }

    /// The stored record in `permanence` identical to `needle`, if any.
    ///
    /// Use this to get hold of the exact record [`remove`](Self::remove)
    /// expects when only the identity fields are known.
    pub fn find(&self, permanence: Permanence, needle: &Event) -> Option<Arc<Event>> {
        self.bucket_ref(permanence).find(needle).cloned()
    }

    fn bucket_ref(&self, permanence: Permanence) -> &Bucket {
        match permanence {
            Permanence::Unconfirmed => &self.unconfirmed,
            Permanence::Confirmed => &self.confirmed,
            Permanence::Orphaned => &self.orphaned,
        }
    }

    fn bucket_mut(&mut self, permanence: Permanence) -> &mut Bucket {
        match permanence {
            Permanence::Unconfirmed => &mut self.unconfirmed,
            Permanence::Confirmed => &mut self.confirmed,
            Permanence::Orphaned => &mut self.orphaned,
        }
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
