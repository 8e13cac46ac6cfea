use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::error::FailureReason;

/// Display label used when a sender has no display name.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Default collection path holding message records.
pub const DEFAULT_FEED_PATH: &str = "messages";

/// Default path exposing the store liveness flag.
pub const DEFAULT_LIVENESS_PATH: &str = ".info/connected";

/// Client connectivity state published to the UI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No live connection, or listeners not attached.
    #[default]
    Disconnected,
    /// Listeners attached, waiting for the liveness signal.
    Connecting,
    /// Liveness signal reports an active connection.
    Connected,
    /// Latest outgoing write failed.
    Failed(FailureReason),
}

impl ConnectionState {
    /// `true` only while the store reports a live connection.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Signed-in identity supplied by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Stable user identifier.
    pub id: String,
    /// Optional display label.
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            display_name,
        }
    }

    /// Display name, falling back to [`ANONYMOUS_AUTHOR`] when missing or blank.
    pub fn author_name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS_AUTHOR)
    }
}

/// One chat message in the published feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Backend-assigned key.
    pub id: String,
    /// Sender user ID.
    pub author_id: String,
    /// Sender display label.
    pub author_name: String,
    /// Message text.
    pub content: String,
    /// Backend timestamp in milliseconds since Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
}

/// A single child of a feed snapshot, as delivered by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    /// Backend-assigned child key.
    pub key: String,
    /// Raw record value.
    pub value: serde_json::Value,
}

impl FeedEntry {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Complete point-in-time view of a feed path, in store iteration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedSnapshot {
    pub entries: Vec<FeedEntry>,
}

impl FeedSnapshot {
    pub fn new(entries: Vec<FeedEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Timestamp value written with an outgoing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    /// Ask the backend to stamp its own clock at write time.
    ServerTime,
}

impl Serialize for TimestampField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::ServerTime => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(".sv", "timestamp")?;
                map.end()
            }
        }
    }
}

/// Record submitted as a new child of the message feed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingRecord {
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub timestamp: TimestampField,
}

impl OutgoingRecord {
    /// Build a record for `identity`, stamped with the server-time sentinel.
    pub fn new(identity: &Identity, content: impl Into<String>) -> Self {
        Self {
            author_id: identity.id.clone(),
            author_name: identity.author_name().to_owned(),
            content: content.into(),
            timestamp: TimestampField::ServerTime,
        }
    }

    /// Materialize the stored record once the backend resolved its clock.
    pub fn resolve(&self, server_time_ms: u64) -> serde_json::Value {
        serde_json::json!({
            "authorId": self.author_id,
            "authorName": self.author_name,
            "content": self.content,
            "timestamp": server_time_ms,
        })
    }
}

/// Store paths used by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPaths {
    /// Message collection path.
    pub messages: String,
    /// Liveness flag path.
    pub liveness: String,
}

impl Default for FeedPaths {
    fn default() -> Self {
        Self {
            messages: DEFAULT_FEED_PATH.to_owned(),
            liveness: DEFAULT_LIVENESS_PATH.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_record_carries_server_time_sentinel() {
        let identity = Identity::new("u1", Some("Sam".into()));
        let record = OutgoingRecord::new(&identity, "hello");

        let wire = serde_json::to_value(&record).expect("record should serialize");
        assert_eq!(
            wire,
            serde_json::json!({
                "authorId": "u1",
                "authorName": "Sam",
                "content": "hello",
                "timestamp": { ".sv": "timestamp" },
            })
        );
    }

    #[test]
    fn blank_display_name_falls_back_to_anonymous() {
        assert_eq!(Identity::new("u1", None).author_name(), ANONYMOUS_AUTHOR);
        assert_eq!(
            Identity::new("u1", Some("   ".into())).author_name(),
            ANONYMOUS_AUTHOR
        );
        assert_eq!(Identity::new("u1", Some(" Ada ".into())).author_name(), "Ada");
    }

    #[test]
    fn resolved_record_uses_backend_clock() {
        let record = OutgoingRecord::new(&Identity::new("u2", None), "hey");
        let stored = record.resolve(1_731_000_000_000);
        assert_eq!(stored["timestamp"], 1_731_000_000_000_u64);
        assert_eq!(stored["authorName"], ANONYMOUS_AUTHOR);
    }
}
