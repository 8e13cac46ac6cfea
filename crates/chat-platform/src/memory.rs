use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use chat_core::{FeedEntry, FeedSnapshot, OutgoingRecord, StoreError, WriteOutcome};
use parking_lot::{Mutex, ReentrantMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{LivenessSink, RealtimeStore, SnapshotSink, SubscriptionHandle, WriteCallback};

/// Clock the store uses to resolve the server-time sentinel.
pub type ServerClock = Arc<dyn Fn() -> u64 + Send + Sync + 'static>;

struct FeedListener {
    path: String,
    token: CancellationToken,
    sink: SnapshotSink,
}

struct LivenessListener {
    token: CancellationToken,
    sink: LivenessSink,
}

#[derive(Default)]
struct StoreState {
    feeds: HashMap<String, Vec<FeedEntry>>,
    connected: bool,
    feed_listeners: Vec<FeedListener>,
    liveness_listeners: Vec<LivenessListener>,
    pending_failures: VecDeque<StoreError>,
    accepted_writes: u64,
}

impl StoreState {
    fn snapshot(&self, path: &str) -> FeedSnapshot {
        FeedSnapshot::new(self.feeds.get(path).cloned().unwrap_or_default())
    }

    fn prune(&mut self) {
        self.feed_listeners.retain(|l| !l.token.is_cancelled());
        self.liveness_listeners.retain(|l| !l.token.is_cancelled());
    }

    fn feed_deliveries(&mut self, path: &str) -> Vec<(SnapshotSink, FeedSnapshot)> {
        self.prune();
        let snapshot = self.snapshot(path);
        self.feed_listeners
            .iter()
            .filter(|l| l.path == path)
            .map(|l| (Arc::clone(&l.sink), snapshot.clone()))
            .collect()
    }
}

/// Process-local realtime store with full-snapshot delivery.
///
/// Feeds keep insertion order. Listeners are invoked on the mutating thread
/// after the state lock is released; each mutation and its deliveries run
/// under one delivery lock, so listeners observe changes in mutation order.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    delivery: Arc<ReentrantMutex<()>>,
    clock: ServerClock,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Store stamped by the system clock, initially online.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(system_now_ms))
    }

    /// Store stamped by `clock`, initially online.
    pub fn with_clock(clock: ServerClock) -> Self {
        let state = StoreState {
            connected: true,
            ..StoreState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            delivery: Arc::new(ReentrantMutex::new(())),
            clock,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Flip the liveness flag and notify liveness listeners.
    pub fn set_connected(&self, connected: bool) {
        let _delivery = self.delivery.lock();
        let sinks = {
            let mut state = self.state.lock();
            if state.connected == connected {
                return;
            }
            state.connected = connected;
            state.prune();
            state
                .liveness_listeners
                .iter()
                .map(|l| Arc::clone(&l.sink))
                .collect::<Vec<_>>()
        };

        debug!(connected, listeners = sinks.len(), "liveness changed");
        for sink in sinks {
            sink(connected);
        }
    }

    /// Insert a raw child value under `key`, bypassing record construction.
    pub fn insert_raw(&self, path: &str, key: impl Into<String>, value: serde_json::Value) {
        let _delivery = self.delivery.lock();
        let key = key.into();
        let deliveries = {
            let mut state = self.state.lock();
            let feed = state.feeds.entry(path.to_owned()).or_default();
            match feed.iter_mut().find(|entry| entry.key == key) {
                Some(existing) => existing.value = value,
                None => feed.push(FeedEntry::new(key, value)),
            }
            state.feed_deliveries(path)
        };
        deliver(deliveries);
    }

    /// Remove the child under `key`; returns whether it existed.
    pub fn remove(&self, path: &str, key: &str) -> bool {
        let _delivery = self.delivery.lock();
        let deliveries = {
            let mut state = self.state.lock();
            let Some(feed) = state.feeds.get_mut(path) else {
                return false;
            };
            let before = feed.len();
            feed.retain(|entry| entry.key != key);
            if feed.len() == before {
                return false;
            }
            state.feed_deliveries(path)
        };
        deliver(deliveries);
        true
    }

    /// Make the next write fail with `error`.
    pub fn fail_next_write(&self, error: StoreError) {
        self.state.lock().pending_failures.push_back(error);
    }

    /// Current contents of the collection at `path`.
    pub fn snapshot(&self, path: &str) -> FeedSnapshot {
        self.state.lock().snapshot(path)
    }

    /// Number of writes the store accepted.
    pub fn accepted_writes(&self) -> u64 {
        self.state.lock().accepted_writes
    }

    /// Number of live (not cancelled) feed and liveness listeners.
    pub fn active_listeners(&self) -> (usize, usize) {
        let mut state = self.state.lock();
        state.prune();
        (state.feed_listeners.len(), state.liveness_listeners.len())
    }
}

impl RealtimeStore for InMemoryStore {
    fn subscribe_liveness(&self, path: &str, sink: LivenessSink) -> SubscriptionHandle {
        let _delivery = self.delivery.lock();
        let token = CancellationToken::new();
        let connected = {
            let mut state = self.state.lock();
            state.liveness_listeners.push(LivenessListener {
                token: token.clone(),
                sink: Arc::clone(&sink),
            });
            state.connected
        };

        trace!(path, connected, "liveness listener registered");
        sink(connected);
        SubscriptionHandle::new(token)
    }

    fn subscribe_feed(&self, path: &str, sink: SnapshotSink) -> SubscriptionHandle {
        let _delivery = self.delivery.lock();
        let token = CancellationToken::new();
        let snapshot = {
            let mut state = self.state.lock();
            state.feed_listeners.push(FeedListener {
                path: path.to_owned(),
                token: token.clone(),
                sink: Arc::clone(&sink),
            });
            state.snapshot(path)
        };

        trace!(path, entries = snapshot.len(), "feed listener registered");
        sink(snapshot);
        SubscriptionHandle::new(token)
    }

    fn push_child(&self, path: &str, record: OutgoingRecord, on_complete: WriteCallback) {
        let _delivery = self.delivery.lock();
        let result = {
            let mut state = self.state.lock();
            match state.pending_failures.pop_front() {
                Some(error) => Err(error),
                None => {
                    let key = push_key();
                    let value = record.resolve((self.clock)());
                    state
                        .feeds
                        .entry(path.to_owned())
                        .or_default()
                        .push(FeedEntry::new(key.clone(), value));
                    state.accepted_writes += 1;
                    Ok((key, state.feed_deliveries(path)))
                }
            }
        };

        match result {
            Ok((key, deliveries)) => {
                debug!(path, %key, "write accepted");
                deliver(deliveries);
                on_complete(WriteOutcome::Accepted { key });
            }
            Err(error) => {
                debug!(path, error = %error, "write rejected");
                on_complete(WriteOutcome::Failed { error });
            }
        }
    }
}

fn deliver(deliveries: Vec<(SnapshotSink, FeedSnapshot)>) {
    for (sink, snapshot) in deliveries {
        sink(snapshot);
    }
}

fn push_key() -> String {
    format!("-{}", Uuid::new_v4().simple())
}

fn system_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
