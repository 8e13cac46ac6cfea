use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    error::RecordError,
    types::{ANONYMOUS_AUTHOR, ChatMessage, FeedEntry, FeedSnapshot},
};

/// Turn one raw feed entry into a message.
pub fn parse_entry(entry: &FeedEntry) -> Result<ChatMessage, RecordError> {
    let record = entry.value.as_object().ok_or(RecordError::NotAnObject)?;

    let author_id = required_str(record, "authorId")?;
    let content = required_str(record, "content")?;
    if content.is_empty() {
        return Err(RecordError::EmptyContent);
    }
    let timestamp_ms = timestamp_ms(record)?;
    let author_name = record
        .get("authorName")
        .and_then(Value::as_str)
        .unwrap_or(ANONYMOUS_AUTHOR);

    Ok(ChatMessage {
        id: entry.key.clone(),
        author_id: author_id.to_owned(),
        author_name: author_name.to_owned(),
        content: content.to_owned(),
        timestamp_ms,
    })
}

/// Convert a full snapshot into the ordered message list.
///
/// Malformed entries are logged and skipped. The sort is stable, so entries
/// sharing a timestamp keep snapshot iteration order.
pub fn normalize_snapshot(snapshot: &FeedSnapshot) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = snapshot
        .entries
        .iter()
        .filter_map(|entry| match parse_entry(entry) {
            Ok(message) => Some(message),
            Err(err) => {
                warn!(key = %entry.key, error = %err, "dropping malformed feed entry");
                None
            }
        })
        .collect();

    messages.sort_by_key(|message| message.timestamp_ms);
    messages
}

fn required_str<'a>(
    record: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, RecordError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(RecordError::MissingField(field)),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(RecordError::WrongType {
            field,
            expected: "string",
        }),
    }
}

fn timestamp_ms(record: &Map<String, Value>) -> Result<u64, RecordError> {
    let value = match record.get("timestamp") {
        None | Some(Value::Null) => return Err(RecordError::MissingField("timestamp")),
        Some(Value::Number(value)) => value,
        Some(_) => {
            return Err(RecordError::WrongType {
                field: "timestamp",
                expected: "number",
            });
        }
    };

    if let Some(ms) = value.as_u64() {
        return Ok(ms);
    }
    match value.as_f64() {
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms.trunc() as u64),
        _ => Err(RecordError::InvalidTimestamp),
    }
}

/// Latest published message list. Each snapshot replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct MessageTimeline {
    items: Vec<ChatMessage>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current messages in display order.
    pub fn items(&self) -> &[ChatMessage] {
        &self.items
    }

    /// Replace the list with `messages`, returning whether anything changed.
    pub fn replace(&mut self, messages: Vec<ChatMessage>) -> bool {
        if self.items == messages {
            return false;
        }
        self.items = messages;
        true
    }

    /// Normalize `snapshot` and replace the list with the result.
    pub fn apply_snapshot(&mut self, snapshot: &FeedSnapshot) -> bool {
        self.replace(normalize_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(key: &str, ts: u64) -> FeedEntry {
        FeedEntry::new(
            key,
            json!({
                "authorId": "u1",
                "authorName": "Ada",
                "content": format!("message {key}"),
                "timestamp": ts,
            }),
        )
    }

    fn timestamps(messages: &[ChatMessage]) -> Vec<u64> {
        messages.iter().map(|m| m.timestamp_ms).collect()
    }

    #[test]
    fn orders_snapshot_by_timestamp() {
        let snapshot = FeedSnapshot::new(vec![entry("a", 300), entry("b", 100), entry("c", 200)]);
        let messages = normalize_snapshot(&snapshot);
        assert_eq!(timestamps(&messages), vec![100, 200, 300]);
        assert_eq!(messages[0].id, "b");
    }

    #[test]
    fn ties_keep_snapshot_iteration_order() {
        let snapshot = FeedSnapshot::new(vec![entry("z", 50), entry("a", 50), entry("m", 10)]);
        let ids: Vec<_> = normalize_snapshot(&snapshot)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m", "z", "a"]);
    }

    #[test]
    fn drops_entry_missing_content_and_keeps_rest() {
        let snapshot = FeedSnapshot::new(vec![
            entry("a", 1),
            FeedEntry::new("bad", json!({ "authorId": "u2", "timestamp": 2 })),
            entry("b", 3),
        ]);
        let messages = normalize_snapshot(&snapshot);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.id != "bad"));
    }

    #[test]
    fn defaults_missing_author_name() {
        let message = parse_entry(&FeedEntry::new(
            "k1",
            json!({ "authorId": "u1", "content": "hi", "timestamp": 100 }),
        ))
        .expect("entry without authorName is valid");
        assert_eq!(message.author_name, "Anonymous");
        assert_eq!(message.timestamp_ms, 100);
    }

    #[test]
    fn rejects_wrongly_typed_fields() {
        let wrong_ts = FeedEntry::new(
            "k",
            json!({ "authorId": "u1", "content": "hi", "timestamp": "100" }),
        );
        assert_eq!(
            parse_entry(&wrong_ts),
            Err(RecordError::WrongType {
                field: "timestamp",
                expected: "number"
            })
        );

        let wrong_author = FeedEntry::new(
            "k",
            json!({ "authorId": 7, "content": "hi", "timestamp": 1 }),
        );
        assert_eq!(
            parse_entry(&wrong_author),
            Err(RecordError::WrongType {
                field: "authorId",
                expected: "string"
            })
        );

        let negative = FeedEntry::new(
            "k",
            json!({ "authorId": "u1", "content": "hi", "timestamp": -5 }),
        );
        assert_eq!(parse_entry(&negative), Err(RecordError::InvalidTimestamp));

        assert_eq!(
            parse_entry(&FeedEntry::new("k", json!("just text"))),
            Err(RecordError::NotAnObject)
        );
    }

    #[test]
    fn keeps_whitespace_content_and_rejects_empty() {
        let blank = parse_entry(&FeedEntry::new(
            "k",
            json!({ "authorId": "u1", "content": "   ", "timestamp": 1 }),
        ))
        .expect("whitespace is still a string value");
        assert_eq!(blank.content, "   ");

        let empty = FeedEntry::new(
            "k",
            json!({ "authorId": "u1", "content": "", "timestamp": 1 }),
        );
        assert_eq!(parse_entry(&empty), Err(RecordError::EmptyContent));
    }

    #[test]
    fn accepts_fractional_epoch() {
        let message = parse_entry(&FeedEntry::new(
            "k",
            json!({ "authorId": "u1", "content": "hi", "timestamp": 1_700_000_000_123.0 }),
        ))
        .expect("float timestamps are numeric");
        assert_eq!(message.timestamp_ms, 1_700_000_000_123);
    }

    #[test]
    fn empty_snapshot_yields_empty_list() {
        let mut timeline = MessageTimeline::new();
        timeline.replace(normalize_snapshot(&FeedSnapshot::new(vec![entry("a", 1)])));
        assert!(timeline.apply_snapshot(&FeedSnapshot::default()));
        assert!(timeline.items().is_empty());
    }

    #[test]
    fn new_entry_preserves_relative_order_of_existing_ones() {
        let first = FeedSnapshot::new(vec![entry("a", 10), entry("b", 30), entry("c", 20)]);
        let mut second = first.clone();
        second.entries.push(entry("d", 25));

        let before: Vec<_> = normalize_snapshot(&first).into_iter().map(|m| m.id).collect();
        let after: Vec<_> = normalize_snapshot(&second)
            .into_iter()
            .map(|m| m.id)
            .filter(|id| id != "d")
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn replace_reports_unchanged_lists() {
        let snapshot = FeedSnapshot::new(vec![entry("a", 1)]);
        let mut timeline = MessageTimeline::new();
        assert!(timeline.apply_snapshot(&snapshot));
        assert!(!timeline.apply_snapshot(&snapshot));
        assert_eq!(timeline.items().len(), 1);
    }
}
