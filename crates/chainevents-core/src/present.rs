//! Read-side presentation: merge buckets, filter by height, sort, limit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bucket::Bucket;
use crate::types::Event;

/// Options accepted by the public query methods.
///
/// Deserializes from `{"minHeight": .., "maxHeight": .., "limit": ..}` so a
/// host can take it straight from request parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    /// Drop events below this height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<u64>,
    /// Drop events above this height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u64>,
    /// Return at most this many events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_height(mut self, height: u64) -> Self {
        self.min_height = Some(height);
        self
    }

    pub fn max_height(mut self, height: u64) -> Self {
        self.max_height = Some(height);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` if `event` falls inside the height range.
    pub fn matches(&self, event: &Event) -> bool {
        self.min_height.map_or(true, |min| event.height >= min)
            && self.max_height.map_or(true, |max| event.height <= max)
    }
}

/// Merge `buckets` in order and apply `query`.
///
/// Each bucket is sorted on its own, but their concatenation is not; pass
/// `sort = true` to re-sort the merged output by descending height. The sort
/// is stable, so equal heights keep bucket order.
pub fn present(buckets: &[&Bucket], query: &EventQuery, sort: bool) -> Vec<Arc<Event>> {
    let mut out: Vec<Arc<Event>> = buckets
        .iter()
        .flat_map(|b| b.iter())
        .filter(|e| query.matches(e))
        .cloned()
        .collect();

    if sort {
        out.sort_by(|a, b| b.height.cmp(&a.height));
    }
    if let Some(limit) = query.limit {
        out.truncate(limit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(heights: &[u64]) -> Bucket {
        let mut b = Bucket::new();
        for h in heights {
            b.insert(Arc::new(Event::new(*h, format!("rk{h}"), "bh", "e", "0")));
        }
        b
    }

    fn heights(events: &[Arc<Event>]) -> Vec<u64> {
        events.iter().map(|e| e.height).collect()
    }

    #[test]
    fn sorted_merge_with_limit() {
        let (a, b, c) = (bucket(&[5, 3, 1]), bucket(&[4, 2]), bucket(&[]));
        let out = present(&[&a, &b, &c], &EventQuery::new().limit(2), true);
        assert_eq!(heights(&out), vec![5, 4]);
    }

    #[test]
    fn unsorted_merge_keeps_bucket_order() {
        let (a, b) = (bucket(&[5, 3]), bucket(&[4]));
        let out = present(&[&a, &b], &EventQuery::new(), false);
        assert_eq!(heights(&out), vec![5, 3, 4]);
    }

    #[test]
    fn height_range_is_inclusive() {
        let a = bucket(&[250, 200, 150, 100, 50]);
        let q = EventQuery::new().min_height(100).max_height(200);
        assert_eq!(heights(&present(&[&a], &q, true)), vec![200, 150, 100]);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let a = bucket(&[3, 2, 1]);
        assert!(present(&[&a], &EventQuery::new().limit(0), false).is_empty());
    }

    #[test]
    fn query_deserializes_from_camel_case() {
        let q: EventQuery = serde_json::from_str(r#"{"minHeight": 7, "limit": 3}"#).unwrap();
        assert_eq!(q, EventQuery::new().min_height(7).limit(3));
    }
}
