use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ConnectionState;

/// Closed classification of failures surfaced through `ConnectionState::Failed`.
///
/// Equality is defined over the variant only, so two failures compare equal
/// when they mean the same thing regardless of how the backend worded them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// Backend security rules rejected the write.
    PermissionDenied,
    /// Transport failure between client and store.
    Network,
    /// Store temporarily unavailable.
    Unavailable,
    /// Write was canceled before the backend committed it.
    WriteCanceled,
    /// Backend rejected the record contents.
    InvalidRecord,
    /// Anything the client cannot classify.
    Internal,
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::Network => "network",
            Self::Unavailable => "unavailable",
            Self::WriteCanceled => "write_canceled",
            Self::InvalidRecord => "invalid_record",
            Self::Internal => "internal",
        }
    }
}

/// Failure reported by the realtime store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason:?}:{code}: {message}")]
pub struct StoreError {
    /// Structured classification.
    pub reason: FailureReason,
    /// Backend error code as reported.
    pub code: String,
    /// Human-readable message, for logs only.
    pub message: String,
}

impl StoreError {
    pub fn new(reason: FailureReason, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build an error from a raw backend error code.
    pub fn from_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self::new(classify_store_code(&code), code, message)
    }
}

/// Map backend error codes to failure reasons.
pub fn classify_store_code(code: &str) -> FailureReason {
    match code.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "permission_denied" | "unauthenticated" => FailureReason::PermissionDenied,
        "disconnected" | "network_error" | "network" | "timeout" => FailureReason::Network,
        "unavailable" | "max_retries" | "overloaded" => FailureReason::Unavailable,
        "write_canceled" | "overridden_by_set" | "cancelled" => FailureReason::WriteCanceled,
        "invalid_data" | "invalid_argument" | "data_stale" => FailureReason::InvalidRecord,
        _ => FailureReason::Internal,
    }
}

/// Internal state-machine rejection. Never crosses the client facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ChatError {
    /// Stable machine-readable error code.
    pub code: &'static str,
    pub message: String,
}

impl ChatError {
    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: ConnectionState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self {
            code: "invalid_state_transition",
            message: format!("cannot run '{action}' while client is in state {current:?}"),
        }
    }
}

/// Reasons a feed entry cannot be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("entry is not an object")]
    NotAnObject,
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("content is empty")]
    EmptyContent,
    #[error("timestamp is not a non-negative epoch")]
    InvalidTimestamp,
}
