use std::sync::Arc;

use chat_core::{Identity, OutgoingRecord, WriteOutcome};
use chat_platform::RealtimeStore;
use tracing::{debug, warn};

/// Builds and submits outgoing message records.
///
/// Never retries and never touches the published list: accepted records come
/// back through the feed listener.
#[derive(Clone)]
pub struct MessageWriter {
    store: Arc<dyn RealtimeStore>,
    path: String,
}

impl MessageWriter {
    pub fn new(store: Arc<dyn RealtimeStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    /// Submit `content` as a new child authored by `sender`.
    pub fn send<F>(&self, content: &str, sender: &Identity, on_outcome: F)
    where
        F: FnOnce(WriteOutcome) + Send + 'static,
    {
        let record = OutgoingRecord::new(sender, content);
        debug!(
            path = %self.path,
            author_id = %record.author_id,
            chars = record.content.chars().count(),
            "submitting message"
        );

        self.store.push_child(
            &self.path,
            record,
            Box::new(move |outcome: WriteOutcome| {
                match &outcome {
                    WriteOutcome::Accepted { key } => debug!(%key, "message accepted"),
                    WriteOutcome::Failed { error } => {
                        warn!(code = %error.code, reason = ?error.reason, "message write failed")
                    }
                }
                on_outcome(outcome);
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use chat_core::{FailureReason, StoreError};
    use chat_platform::InMemoryStore;
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn submits_record_with_author_fallback() {
        let store = InMemoryStore::with_clock(Arc::new(|| 500_u64));
        let writer = MessageWriter::new(Arc::new(store.clone()), "messages");

        writer.send("hello", &Identity::new("u1", None), |_| {});

        let snapshot = store.snapshot("messages");
        assert_eq!(snapshot.len(), 1);
        let value = &snapshot.entries[0].value;
        assert_eq!(value["authorId"], "u1");
        assert_eq!(value["authorName"], "Anonymous");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["timestamp"], 500);
    }

    #[test]
    fn reports_failure_without_retrying() {
        let store = InMemoryStore::new();
        store.fail_next_write(StoreError::from_code("permission_denied", "denied"));
        let writer = MessageWriter::new(Arc::new(store.clone()), "messages");

        let outcome = Arc::new(Mutex::new(None));
        let outcome_clone = Arc::clone(&outcome);
        writer.send("hi", &Identity::new("u1", Some("Ada".into())), move |o| {
            *outcome_clone.lock() = Some(o)
        });

        match outcome.lock().take() {
            Some(WriteOutcome::Failed { error }) => {
                assert_eq!(error.reason, FailureReason::PermissionDenied)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.accepted_writes(), 0);
        assert!(store.snapshot("messages").is_empty());
    }
}
