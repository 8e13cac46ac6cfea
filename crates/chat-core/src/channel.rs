use std::sync::Arc;

use tokio::sync::watch;

use crate::types::{ChatMessage, ConnectionState};

/// Receiver for the published message list.
pub type MessagesStream = watch::Receiver<Arc<[ChatMessage]>>;

/// Receiver for the published connection state.
pub type StateStream = watch::Receiver<ConnectionState>;

/// Latest-value channels for the two UI observables.
///
/// Publication never blocks and never fails; receivers always see the most
/// recent value.
#[derive(Debug, Clone)]
pub struct ClientChannels {
    messages_tx: watch::Sender<Arc<[ChatMessage]>>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Default for ClientChannels {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientChannels {
    pub fn new() -> Self {
        let (messages_tx, _) = watch::channel(Arc::<[ChatMessage]>::from(Vec::new()));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            messages_tx,
            state_tx,
        }
    }

    /// Subscribe to message list updates.
    pub fn subscribe_messages(&self) -> MessagesStream {
        self.messages_tx.subscribe()
    }

    /// Subscribe to connection state updates.
    pub fn subscribe_state(&self) -> StateStream {
        self.state_tx.subscribe()
    }

    /// Latest published message list.
    pub fn messages(&self) -> Arc<[ChatMessage]> {
        self.messages_tx.borrow().clone()
    }

    /// Latest published connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn publish_messages(&self, messages: &[ChatMessage]) {
        self.messages_tx.send_replace(Arc::from(messages));
    }

    pub fn publish_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn subscribers_observe_latest_state() {
        let channels = ClientChannels::new();
        let mut rx = channels.subscribe_state();
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);

        channels.publish_state(ConnectionState::Connecting);
        channels.publish_state(ConnectionState::Connected);

        timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("change timeout")
            .expect("sender alive");
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connected);
    }

    #[test]
    fn publishes_without_subscribers() {
        let channels = ClientChannels::new();
        channels.publish_messages(&[ChatMessage {
            id: "k".into(),
            author_id: "u1".into(),
            author_name: "Ada".into(),
            content: "hi".into(),
            timestamp_ms: 1,
        }]);
        assert_eq!(channels.messages().len(), 1);
    }
}
