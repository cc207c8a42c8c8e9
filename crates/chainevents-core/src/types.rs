//! Shared types: event records, permanence tags, subscription keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EventStateError;

// ─── Event ────────────────────────────────────────────────────────────────────

/// Identity metadata attached to every streamed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Stable discriminator for otherwise identical events (e.g. log index).
    pub id: String,
    /// Confirmations observed when the event was last seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
}

/// A streamed chain event.
///
/// Only `height`, `request_key`, `block_hash` and `meta.id` take part in
/// identity; everything else is carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Block height the event occurred at.
    pub height: u64,
    /// Request key of the transaction that emitted the event.
    pub request_key: String,
    /// Hash of the containing block.
    pub block_hash: String,
    /// Event name, e.g. `"coin.TRANSFER"`.
    pub name: String,
    pub meta: EventMeta,
    /// Remaining payload fields (`params`, `moduleHash`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// Build an event with an empty payload.
    pub fn new(
        height: u64,
        request_key: impl Into<String>,
        block_hash: impl Into<String>,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            height,
            request_key: request_key.into(),
            block_hash: block_hash.into(),
            name: name.into(),
            meta: EventMeta {
                id: id.into(),
                confirmations: None,
            },
            extra: serde_json::Map::new(),
        }
    }

    /// Attach a payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

// ─── Permanence ───────────────────────────────────────────────────────────────

/// The finality phase an event is tracked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permanence {
    Unconfirmed,
    Confirmed,
    Orphaned,
}

impl Permanence {
    /// All phases, in the order buckets are merged and searched.
    pub const ALL: [Permanence; 3] = [Self::Unconfirmed, Self::Confirmed, Self::Orphaned];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfirmed => "unconfirmed",
            Self::Confirmed => "confirmed",
            Self::Orphaned => "orphaned",
        }
    }
}

impl fmt::Display for Permanence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permanence {
    type Err = EventStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unconfirmed" => Ok(Self::Unconfirmed),
            "confirmed" => Ok(Self::Confirmed),
            "orphaned" => Ok(Self::Orphaned),
            other => Err(EventStateError::InvalidKey(format!("unknown permanence '{other}'"))),
        }
    }
}

// ─── StreamType ───────────────────────────────────────────────────────────────

/// Kind of stream a subscription follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    /// Events matching a qualified event name.
    Event,
    /// Events touching an account.
    Account,
    /// Events emitted by a module.
    Module,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Account => "account",
            Self::Module => "module",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamType {
    type Err = EventStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(Self::Event),
            "account" => Ok(Self::Account),
            "module" => Ok(Self::Module),
            other => Err(EventStateError::InvalidKey(format!("unknown stream type '{other}'"))),
        }
    }
}

// ─── SubscriptionKey ──────────────────────────────────────────────────────────

/// Identifies one (stream type, filter) subscription and its persisted buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    pub filter: String,
}

impl SubscriptionKey {
    pub fn new(stream_type: StreamType, filter: impl Into<String>) -> Self {
        Self {
            stream_type,
            filter: filter.into(),
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stream_type, self.filter)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
