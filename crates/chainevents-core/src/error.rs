//! Error types for the chainevents state tracker.

use thiserror::Error;

/// Errors surfaced by persistence and key parsing.
///
/// Duplicate adds and removals of unknown events are not errors: those
/// operations return `false` and log a warning instead.
#[derive(Debug, Error)]
pub enum EventStateError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<serde_json::Error> for EventStateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
