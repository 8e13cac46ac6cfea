//! Seams to the external collaborators of the chat client: the realtime
//! store and the authentication provider.

use std::sync::Arc;

use chat_core::{FeedSnapshot, Identity, OutgoingRecord, WriteOutcome};
use tokio_util::sync::CancellationToken;

mod auth;
mod memory;

pub use auth::InMemoryAuthProvider;
pub use memory::{InMemoryStore, ServerClock};

/// Receives every liveness signal change.
pub type LivenessSink = Arc<dyn Fn(bool) + Send + Sync + 'static>;

/// Receives a full feed snapshot on every change.
pub type SnapshotSink = Arc<dyn Fn(FeedSnapshot) + Send + Sync + 'static>;

/// Receives the outcome of one write.
pub type WriteCallback = Box<dyn FnOnce(WriteOutcome) + Send + 'static>;

/// Receives the signed-in identity whenever it changes.
pub type IdentitySink = Arc<dyn Fn(Option<Identity>) + Send + Sync + 'static>;

/// Token for one listener registration.
///
/// Cancelling consumes the handle; dropping it cancels as well.
#[derive(Debug)]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Revoke the registration.
    pub fn cancel(self) {
        self.token.cancel();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Backend realtime store.
///
/// Sinks may be invoked from any thread, including synchronously from inside
/// the registering call.
pub trait RealtimeStore: Send + Sync {
    /// Listen to the boolean liveness flag at `path`.
    fn subscribe_liveness(&self, path: &str, sink: LivenessSink) -> SubscriptionHandle;

    /// Listen to full snapshots of the collection at `path`.
    fn subscribe_feed(&self, path: &str, sink: SnapshotSink) -> SubscriptionHandle;

    /// Append `record` under a backend-generated key.
    fn push_child(&self, path: &str, record: OutgoingRecord, on_complete: WriteCallback);
}

/// Authentication provider.
pub trait AuthProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    /// Register `sink` for identity changes. The current identity is
    /// delivered right away.
    fn on_identity_changed(&self, sink: IdentitySink) -> SubscriptionHandle;
}
