//! Event identity — decides whether two records describe the same event.

use std::sync::Arc;

use crate::types::Event;

/// Returns `true` if `a` and `b` are the same logical event.
///
/// Compares `height`, `meta.id`, `request_key` and `block_hash`; the payload
/// is never inspected.
pub fn identical(a: &Event, b: &Event) -> bool {
    a.height == b.height
        && a.meta.id == b.meta.id
        && a.request_key == b.request_key
        && a.block_hash == b.block_hash
}

/// Index of the first record in `events[start..]` identical to `needle`.
///
/// `events` must be sorted by descending height: the scan stops at the first
/// entry lower than the needle.
pub fn position_from(needle: &Event, events: &[Arc<Event>], start: usize) -> Option<usize> {
    for (idx, event) in events.iter().enumerate().skip(start) {
        if event.height < needle.height {
            break;
        }
        if identical(event, needle) {
            return Some(idx);
        }
    }
    None
}

/// Returns `true` if `events[start..]` holds a record identical to `needle`.
pub fn exists_from(needle: &Event, events: &[Arc<Event>], start: usize) -> bool {
    position_from(needle, events, start).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(height: u64, rk: &str, bh: &str, id: &str) -> Event {
        Event::new(height, rk, bh, "coin.TRANSFER", id)
    }

    #[test]
    fn identical_ignores_payload_and_name() {
        let a = ev(10, "rk", "bh", "0").with_field("params", serde_json::json!([1]));
        let mut b = ev(10, "rk", "bh", "0");
        b.name = "other".into();
        assert!(identical(&a, &b));
    }

    #[test]
    fn identical_checks_every_identity_field() {
        let base = ev(10, "rk", "bh", "0");
        assert!(!identical(&base, &ev(11, "rk", "bh", "0")));
        assert!(!identical(&base, &ev(10, "rk2", "bh", "0")));
        assert!(!identical(&base, &ev(10, "rk", "bh2", "0")));
        assert!(!identical(&base, &ev(10, "rk", "bh", "1")));
    }

    #[test]
    fn exists_stops_below_needle_height() {
        // Out-of-order tail: a matching record hidden behind a lower height
        // is not reachable, which proves the scan stops early.
        let events: Vec<Arc<Event>> = [
            ev(12, "a", "x", "0"),
            ev(9, "b", "x", "0"),
            ev(10, "c", "x", "0"),
        ]
        .into_iter()
        .map(Arc::new)
        .collect();
        assert!(exists_from(&ev(12, "a", "x", "0"), &events, 0));
        assert_eq!(position_from(&ev(12, "a", "x", "0"), &events, 0), Some(0));
        assert!(!exists_from(&ev(10, "c", "x", "0"), &events, 0));
        assert!(!exists_from(&ev(12, "a", "x", "0"), &events, 1));
    }
}
