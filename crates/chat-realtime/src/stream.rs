use std::sync::Arc;

use chat_core::FeedSnapshot;
use chat_platform::{RealtimeStore, SubscriptionHandle};
use tracing::trace;

/// Feed listener that hands every full snapshot to the client.
///
/// Snapshots are normalized at the client's serialization point (see
/// [`chat_core::MessageTimeline::apply_snapshot`]) so lists are applied in
/// delivery order.
pub struct MessageStream;

impl MessageStream {
    pub fn attach<F>(store: &dyn RealtimeStore, path: &str, forward: F) -> SubscriptionHandle
    where
        F: Fn(FeedSnapshot) + Send + Sync + 'static,
    {
        let path_label = path.to_owned();
        store.subscribe_feed(
            path,
            Arc::new(move |snapshot: FeedSnapshot| {
                trace!(path = %path_label, entries = snapshot.len(), "feed snapshot");
                forward(snapshot);
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use chat_core::normalize_snapshot;
    use chat_platform::InMemoryStore;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    #[test]
    fn forwards_full_snapshots_including_empty_ones() {
        let store = InMemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let _handle = MessageStream::attach(&store, "messages", move |snapshot| {
            seen_clone.lock().push(normalize_snapshot(&snapshot).len())
        });
        store.insert_raw(
            "messages",
            "a",
            json!({ "authorId": "u1", "content": "hi", "timestamp": 1 }),
        );
        store.insert_raw("messages", "b", json!({ "authorId": "u1" }));

        assert_eq!(*seen.lock(), vec![0, 1, 1]);
    }
}
