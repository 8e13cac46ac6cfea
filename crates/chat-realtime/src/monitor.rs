use std::sync::Arc;

use chat_core::{ClientInput, liveness_state};
use chat_platform::{RealtimeStore, SubscriptionHandle};
use tracing::debug;

/// Translates the store liveness flag into state-machine input.
///
/// Holds no state of its own and never retries; reconnection belongs to the
/// store transport.
pub struct ConnectionMonitor;

impl ConnectionMonitor {
    /// Listen to `path` and hand each signal to `forward`.
    pub fn attach<F>(store: &dyn RealtimeStore, path: &str, forward: F) -> SubscriptionHandle
    where
        F: Fn(ClientInput) + Send + Sync + 'static,
    {
        let path_label = path.to_owned();
        store.subscribe_liveness(
            path,
            Arc::new(move |connected: bool| {
                debug!(
                    path = %path_label,
                    connected,
                    state = ?liveness_state(connected),
                    "liveness signal"
                );
                forward(ClientInput::Liveness(connected));
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use chat_platform::InMemoryStore;
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn forwards_each_signal_as_liveness_input() {
        let store = InMemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let handle = ConnectionMonitor::attach(&store, ".info/connected", move |input| {
            seen_clone.lock().push(input)
        });
        store.set_connected(false);
        handle.cancel();
        store.set_connected(true);

        assert_eq!(
            *seen.lock(),
            vec![ClientInput::Liveness(true), ClientInput::Liveness(false)]
        );
    }
}
