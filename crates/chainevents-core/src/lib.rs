//! chainevents-core — finality-aware event state for streaming chain events.
//!
//! # Architecture
//!
//! ```text
//! stream service ──add/remove──▶ EventState (one per type + filter)
//!                                    ├── Bucket × 3   (unconfirmed / confirmed / orphaned)
//!                                    ├── identity     (dedup comparator)
//!                                    ├── present      (merge, height range, sort, limit)
//!                                    ├── EventLogger  (injected warn sink)
//!                                    └── BucketStore  (memory / SQLite backends)
//! ```

pub mod bucket;
pub mod error;
pub mod identity;
pub mod logger;
pub mod present;
pub mod state;
pub mod store;
pub mod types;

pub use bucket::Bucket;
pub use error::EventStateError;
pub use identity::identical;
pub use logger::{EventLogger, TracingLogger};
pub use present::{present, EventQuery};
pub use state::EventState;
pub use store::{BucketStore, MemoryBucketStore};
pub use types::{Event, EventMeta, Permanence, StreamType, SubscriptionKey};
