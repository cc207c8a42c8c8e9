//! Height-ordered event bucket.

use std::sync::Arc;

use crate::identity::{exists_from, position_from};
use crate::types::Event;

/// A sequence of events kept sorted by descending height (newest first).
///
/// Records are shared (`Arc`) so the tracker and its caller can refer to the
/// same record; removal goes by pointer identity.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    events: Vec<Arc<Event>>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bucket from persisted records.
    ///
    /// The records are re-sorted (stably) in case the stored order was not
    /// descending.
    pub fn from_events(events: Vec<Event>) -> Self {
        let mut events: Vec<Arc<Event>> = events.into_iter().map(Arc::new).collect();
        events.sort_by(|a, b| b.height.cmp(&a.height));
        Self { events }
    }

    /// Index of the first entry whose height is `<= height`.
    pub fn insertion_point(&self, height: u64) -> usize {
        self.events.partition_point(|e| e.height > height)
    }

    /// Insert `event` at its sorted position.
    ///
    /// Returns `false` without touching the bucket if an identical event is
    /// already present. A new event lands before existing entries of the
    /// same height.
    pub fn insert(&mut self, event: Arc<Event>) -> bool {
        let idx = self.insertion_point(event.height);
        if exists_from(&event, &self.events, idx) {
            return false;
        }
        self.events.insert(idx, event);
        true
    }

    /// Remove the exact record `event` (pointer identity).
    pub fn remove(&mut self, event: &Arc<Event>) -> bool {
        match self.events.iter().position(|e| Arc::ptr_eq(e, event)) {
            Some(idx) => {
                self.events.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if an event identical to `needle` is in the bucket.
    pub fn contains(&self, needle: &Event) -> bool {
        exists_from(needle, &self.events, self.insertion_point(needle.height))
    }

    /// The stored record identical to `needle`, if any.
    pub fn find(&self, needle: &Event) -> Option<&Arc<Event>> {
        position_from(needle, &self.events, self.insertion_point(needle.height))
            .map(|idx| &self.events[idx])
    }

    pub fn as_slice(&self) -> &[Arc<Event>] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Event>> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
