use std::sync::Arc;

use chat_core::Identity;
use parking_lot::{Mutex, ReentrantMutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{AuthProvider, IdentitySink, SubscriptionHandle};

#[derive(Default)]
struct AuthState {
    identity: Option<Identity>,
    listeners: Vec<(CancellationToken, IdentitySink)>,
}

/// Auth provider driven explicitly by `sign_in`/`sign_out`.
///
/// Each change and its notifications run under one delivery lock, so
/// listeners see identities in the order they were applied.
#[derive(Clone, Default)]
pub struct InMemoryAuthProvider {
    state: Arc<Mutex<AuthState>>,
    delivery: Arc<ReentrantMutex<()>>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, identity: Identity) {
        debug!(user_id = %identity.id, "auth: signed in");
        self.set_identity(Some(identity));
    }

    pub fn sign_out(&self) {
        debug!("auth: signed out");
        self.set_identity(None);
    }

    fn set_identity(&self, identity: Option<Identity>) {
        let _delivery = self.delivery.lock();
        let sinks = {
            let mut state = self.state.lock();
            state.identity = identity.clone();
            state.listeners.retain(|(token, _)| !token.is_cancelled());
            state
                .listeners
                .iter()
                .map(|(_, sink)| Arc::clone(sink))
                .collect::<Vec<_>>()
        };
        for sink in sinks {
            sink(identity.clone());
        }
    }
}

impl AuthProvider for InMemoryAuthProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.state.lock().identity.clone()
    }

    fn on_identity_changed(&self, sink: IdentitySink) -> SubscriptionHandle {
        let _delivery = self.delivery.lock();
        let token = CancellationToken::new();
        let current = {
            let mut state = self.state.lock();
            state.listeners.push((token.clone(), Arc::clone(&sink)));
            state.identity.clone()
        };
        sink(current);
        SubscriptionHandle::new(token)
    }
}
