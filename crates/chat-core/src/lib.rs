//! Core contract of the realtime chat sync client.
//!
//! This crate defines the message and connectivity model, the connection
//! state machine, feed snapshot normalization, and the observable channels
//! the client publishes to the UI layer. It performs no I/O.

/// Latest-value channels for UI observables.
pub mod channel;
/// Failure classification and error types.
pub mod error;
/// Feed snapshot parsing, ordering and the published timeline.
pub mod feed;
/// Liveness and write-outcome normalization.
pub mod normalization;
/// Client connection state machine.
pub mod state_machine;
/// Domain and wire types.
pub mod types;

pub use channel::{ClientChannels, MessagesStream, StateStream};
pub use error::{ChatError, FailureReason, RecordError, StoreError, classify_store_code};
pub use feed::{MessageTimeline, normalize_snapshot, parse_entry};
pub use normalization::{WriteOutcome, liveness_state, write_outcome_state};
pub use state_machine::{ClientInput, ConnectionStateMachine, Directive, Step};
pub use types::{
    ANONYMOUS_AUTHOR, ChatMessage, ConnectionState, DEFAULT_FEED_PATH, DEFAULT_LIVENESS_PATH,
    FeedEntry, FeedPaths, FeedSnapshot, Identity, OutgoingRecord, TimestampField,
};
