use crate::{error::StoreError, types::ConnectionState};

/// Result of submitting one outgoing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Backend accepted the record under `key`.
    Accepted { key: String },
    /// Backend rejected or lost the write.
    Failed { error: StoreError },
}

/// Translate a liveness signal into the connectivity state it implies.
pub fn liveness_state(connected: bool) -> ConnectionState {
    if connected {
        ConnectionState::Connected
    } else {
        ConnectionState::Disconnected
    }
}

/// Connection state a write outcome implies, if any.
///
/// Accepted writes change nothing here; the stored record comes back through
/// the feed listener.
pub fn write_outcome_state(outcome: &WriteOutcome) -> Option<ConnectionState> {
    match outcome {
        WriteOutcome::Accepted { .. } => None,
        WriteOutcome::Failed { error } => Some(ConnectionState::Failed(error.reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;

    #[test]
    fn maps_liveness_signal() {
        assert_eq!(liveness_state(true), ConnectionState::Connected);
        assert_eq!(liveness_state(false), ConnectionState::Disconnected);
    }

    #[test]
    fn accepted_write_leaves_state_alone() {
        let outcome = WriteOutcome::Accepted {
            key: "-Nabc".into(),
        };
        assert_eq!(write_outcome_state(&outcome), None);
    }

    #[test]
    fn failed_write_maps_to_structured_reason() {
        let outcome = WriteOutcome::Failed {
            error: StoreError::from_code("permission_denied", "Permission denied"),
        };
        assert_eq!(
            write_outcome_state(&outcome),
            Some(ConnectionState::Failed(FailureReason::PermissionDenied))
        );
    }
}
