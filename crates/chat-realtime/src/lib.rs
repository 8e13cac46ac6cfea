//! Realtime chat sync client.
//!
//! [`ChatClient`] keeps a local, timestamp-ordered view of the shared message
//! feed in step with a [`RealtimeStore`], tracks connectivity from the store
//! liveness flag, and submits outgoing messages. All published state changes
//! go through one lock; listener callbacks carry the generation they were
//! registered under and are dropped once that generation is retired.

use std::sync::{Arc, Weak};

use chat_core::{
    ChatMessage, ClientChannels, ClientInput, ConnectionState, ConnectionStateMachine, Directive,
    FeedPaths, FeedSnapshot, Identity, MessageTimeline, MessagesStream, StateStream, Step,
    WriteOutcome, write_outcome_state,
};
use chat_platform::{AuthProvider, RealtimeStore, SubscriptionHandle};
use parking_lot::Mutex;
use tracing::{debug, info, trace};

pub mod config;
mod monitor;
mod stream;
mod writer;

pub use config::{ChatClientConfig, ConfigError};
pub use monitor::ConnectionMonitor;
pub use stream::MessageStream;
pub use writer::MessageWriter;

/// What `send_message` did with the text it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDisposition {
    /// Handed to the writer; the outcome arrives through `connection_state`.
    Submitted,
    /// Client is not connected; nothing was written.
    NotConnected,
    /// No signed-in identity; nothing was written.
    Unauthenticated,
    /// Text was empty after trimming.
    EmptyContent,
    /// Text exceeds the configured character limit.
    ContentTooLong,
}

struct ListenerPair {
    liveness: SubscriptionHandle,
    feed: SubscriptionHandle,
}

impl ListenerPair {
    fn cancel(self) {
        self.liveness.cancel();
        self.feed.cancel();
    }
}

#[derive(Default)]
struct ClientCore {
    machine: ConnectionStateMachine,
    timeline: MessageTimeline,
    generation: u64,
    listeners: Option<ListenerPair>,
    identity: Option<Identity>,
}

struct Shared {
    store: Arc<dyn RealtimeStore>,
    writer: MessageWriter,
    paths: FeedPaths,
    max_content_chars: usize,
    core: Mutex<ClientCore>,
    channels: ClientChannels,
}

impl Shared {
    fn publish_step(&self, step: &Step) {
        if let Some(state) = step.changed {
            debug!(?state, "connection state changed");
            self.channels.publish_state(state);
        }
    }

    fn connect(self: &Arc<Self>) {
        let (generation, stale) = {
            let mut core = self.core.lock();
            let Ok(step) = core.machine.apply(ClientInput::Connect) else {
                return;
            };
            if !matches!(step.directive, Directive::Attach | Directive::Reattach) {
                trace!(state = ?core.machine.state(), "connect ignored; listeners already attached");
                return;
            }
            core.generation += 1;
            self.publish_step(&step);
            (core.generation, core.listeners.take())
        };

        if let Some(stale) = stale {
            stale.cancel();
        }
        info!(generation, feed = %self.paths.messages, "attaching chat listeners");

        let weak = Arc::downgrade(self);
        let liveness = ConnectionMonitor::attach(
            self.store.as_ref(),
            &self.paths.liveness,
            move |input| with_shared(&weak, |shared| shared.on_liveness(generation, input)),
        );
        let weak = Arc::downgrade(self);
        let feed = MessageStream::attach(self.store.as_ref(), &self.paths.messages, move |snapshot| {
            with_shared(&weak, |shared| shared.on_snapshot(generation, snapshot))
        });
        let pair = ListenerPair { liveness, feed };

        let mut core = self.core.lock();
        if core.generation == generation && core.machine.is_attached() {
            core.listeners = Some(pair);
        } else {
            drop(core);
            debug!(generation, "connect superseded while attaching; releasing listeners");
            pair.cancel();
        }
    }

    fn disconnect(&self) {
        let stale = {
            let mut core = self.core.lock();
            let Ok(step) = core.machine.apply(ClientInput::Disconnect) else {
                return;
            };
            core.generation += 1;
            self.publish_step(&step);
            match step.directive {
                Directive::Detach => core.listeners.take(),
                _ => None,
            }
        };

        if let Some(stale) = stale {
            info!("releasing chat listeners");
            stale.cancel();
        }
    }

    fn on_liveness(&self, generation: u64, input: ClientInput) {
        let mut core = self.core.lock();
        if core.generation != generation {
            trace!(generation, "discarding liveness signal from retired listener");
            return;
        }
        match core.machine.apply(input) {
            Ok(step) => self.publish_step(&step),
            Err(err) => trace!(error = %err, "liveness signal ignored"),
        }
    }

    fn on_snapshot(&self, generation: u64, snapshot: FeedSnapshot) {
        let mut core = self.core.lock();
        if core.generation != generation {
            trace!(generation, "discarding snapshot from retired listener");
            return;
        }
        if core.timeline.apply_snapshot(&snapshot) {
            debug!(messages = core.timeline.items().len(), "message list replaced");
            self.channels.publish_messages(core.timeline.items());
        }
    }

    fn on_write_outcome(&self, generation: u64, outcome: WriteOutcome) {
        let Some(ConnectionState::Failed(reason)) = write_outcome_state(&outcome) else {
            return;
        };

        let mut core = self.core.lock();
        if core.generation != generation {
            debug!(generation, ?reason, "discarding write failure from retired session");
            return;
        }
        match core.machine.apply(ClientInput::WriteFailed(reason)) {
            Ok(step) => self.publish_step(&step),
            Err(err) => trace!(error = %err, "write failure ignored"),
        }
    }

    fn on_identity(self: &Arc<Self>, identity: Option<Identity>) {
        let present = identity.is_some();
        if let Some(identity) = &identity {
            info!(user_id = %identity.id, "user present; connecting");
        } else {
            info!("user absent; disconnecting");
        }
        self.core.lock().identity = identity;

        if present {
            self.connect();
        } else {
            self.disconnect();
        }
    }

    fn send_message(self: &Arc<Self>, text: &str) -> SendDisposition {
        let content = text.trim();
        if content.is_empty() {
            debug!("ignoring empty send request");
            return SendDisposition::EmptyContent;
        }
        if content.chars().count() > self.max_content_chars {
            debug!(limit = self.max_content_chars, "send rejected: content too long");
            return SendDisposition::ContentTooLong;
        }

        let (sender, generation) = {
            let mut core = self.core.lock();
            match core.machine.apply(ClientInput::Send) {
                Ok(Step {
                    directive: Directive::Submit,
                    ..
                }) => {}
                Ok(_) => return SendDisposition::NotConnected,
                Err(err) => {
                    debug!(error = %err, "send rejected: not connected");
                    return SendDisposition::NotConnected;
                }
            }
            let Some(identity) = core.identity.clone() else {
                debug!("send rejected: no signed-in user");
                return SendDisposition::Unauthenticated;
            };
            (identity, core.generation)
        };

        let weak = Arc::downgrade(self);
        self.writer.send(content, &sender, move |outcome| {
            with_shared(&weak, |shared| shared.on_write_outcome(generation, outcome))
        });
        SendDisposition::Submitted
    }
}

fn with_shared(weak: &Weak<Shared>, f: impl FnOnce(&Arc<Shared>)) {
    if let Some(shared) = weak.upgrade() {
        f(&shared);
    }
}

/// Facade consumed by the UI layer.
///
/// Construct one per process at the composition root and share it behind an
/// `Arc`. Dropping the client disconnects it.
pub struct ChatClient {
    shared: Arc<Shared>,
    auth_listener: Mutex<Option<SubscriptionHandle>>,
}

impl ChatClient {
    pub fn new(store: Arc<dyn RealtimeStore>, config: ChatClientConfig) -> Self {
        let writer = MessageWriter::new(Arc::clone(&store), config.paths.messages.clone());
        Self {
            shared: Arc::new(Shared {
                store,
                writer,
                paths: config.paths,
                max_content_chars: config.max_content_chars,
                core: Mutex::new(ClientCore::default()),
                channels: ClientChannels::new(),
            }),
            auth_listener: Mutex::new(None),
        }
    }

    /// Follow identity changes from `provider`: a present user connects, an
    /// absent one disconnects. Replaces any previously attached provider.
    pub fn attach_auth(&self, provider: &dyn AuthProvider) {
        let weak = Arc::downgrade(&self.shared);
        let handle = provider.on_identity_changed(Arc::new(move |identity: Option<Identity>| {
            with_shared(&weak, |shared| shared.on_identity(identity))
        }));
        if let Some(previous) = self.auth_listener.lock().replace(handle) {
            previous.cancel();
        }
    }

    /// Apply an identity change directly.
    pub fn handle_identity(&self, identity: Option<Identity>) {
        self.shared.on_identity(identity);
    }

    pub fn identity(&self) -> Option<Identity> {
        self.shared.core.lock().identity.clone()
    }

    /// Attach the liveness and feed listeners. No-op while connecting or
    /// connected.
    pub fn connect(&self) {
        self.shared.connect();
    }

    /// Release both listeners. Callbacks still in flight are discarded.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    /// Submit trimmed `text` as the signed-in user.
    pub fn send_message(&self, text: &str) -> SendDisposition {
        self.shared.send_message(text)
    }

    /// Latest published message list.
    pub fn messages(&self) -> Arc<[ChatMessage]> {
        self.shared.channels.messages()
    }

    /// Latest published connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.channels.state()
    }

    pub fn subscribe_messages(&self) -> MessagesStream {
        self.shared.channels.subscribe_messages()
    }

    pub fn subscribe_state(&self) -> StateStream {
        self.shared.channels.subscribe_state()
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        if let Some(auth) = self.auth_listener.get_mut().take() {
            auth.cancel();
        }
        self.shared.disconnect();
    }
}
