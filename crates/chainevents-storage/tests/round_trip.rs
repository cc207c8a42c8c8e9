//! Save/load round trips of a full `EventState` through each backend.

use std::sync::Arc;

use chainevents_core::{
    BucketStore, Event, EventQuery, EventState, Permanence, StreamType, SubscriptionKey,
    TracingLogger,
};

fn key() -> SubscriptionKey {
    SubscriptionKey::new(StreamType::Account, "k:alice")
}

fn state(store: Arc<dyn BucketStore>) -> EventState {
    EventState::new(key(), store, Arc::new(TracingLogger::new(key().to_string())))
}

fn ev(height: u64, id: &str) -> Arc<Event> {
    Arc::new(
        Event::new(height, format!("rk-{height}-{id}"), format!("bh-{height}"), "coin.TRANSFER", id)
            .with_field("chain", serde_json::json!(1)),
    )
}

fn populate(st: &mut EventState) {
    for (h, id) in [(40, "0"), (40, "1"), (38, "0"), (35, "0")] {
        st.add(Permanence::Unconfirmed, ev(h, id));
    }
    for h in [30, 25, 20] {
        st.add(Permanence::Confirmed, ev(h, "0"));
    }
    st.add(Permanence::Orphaned, ev(39, "0"));
}

async fn assert_round_trip(store: Arc<dyn BucketStore>) {
    let mut original = state(store.clone());
    populate(&mut original);
    original.save().await.unwrap();

    let mut reloaded = state(store);
    reloaded.load().await.unwrap();

    for p in Permanence::ALL {
        let a: Vec<&Event> = original.bucket(p).iter().map(|e| &**e).collect();
        let b: Vec<&Event> = reloaded.bucket(p).iter().map(|e| &**e).collect();
        assert_eq!(a, b, "{p} bucket changed across save/load");
    }

    let all = reloaded.get_all_events(&EventQuery::new().max_height(38).limit(3));
    let heights: Vec<u64> = all.iter().map(|e| e.height).collect();
    assert_eq!(heights, vec![38, 35, 30]);

    // a reloaded record is a fresh allocation, but still deduplicates
    assert!(!reloaded.add(Permanence::Confirmed, ev(25, "0")));
}

#[cfg(feature = "memory")]
#[tokio::test]
async fn memory_round_trip() {
    assert_round_trip(Arc::new(chainevents_storage::InMemoryStorage::new())).await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn sqlite_round_trip() {
    let store = chainevents_storage::SqliteStorage::in_memory().await.unwrap();
    assert_round_trip(Arc::new(store)).await;
}
