use crate::{
    error::{ChatError, FailureReason},
    types::ConnectionState,
};

/// Input accepted by the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientInput {
    /// Caller or auth provider asked to connect.
    Connect,
    /// Caller, auth provider or teardown asked to disconnect.
    Disconnect,
    /// Liveness signal delivered by the attached listener.
    Liveness(bool),
    /// Caller asked to submit an outgoing message.
    Send,
    /// An outgoing write reported failure.
    WriteFailed(FailureReason),
}

/// Side effect the owner must carry out after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    None,
    /// Register both listeners.
    Attach,
    /// Release the current listener pair, then register a fresh one.
    Reattach,
    /// Release both listeners.
    Detach,
    /// Hand the message to the writer.
    Submit,
}

/// Outcome of one accepted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// New state when the input changed it.
    pub changed: Option<ConnectionState>,
    pub directive: Directive,
}

impl Step {
    fn idle() -> Self {
        Self {
            changed: None,
            directive: Directive::None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    attached: bool,
}

impl ConnectionStateMachine {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a listener pair is currently registered.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn apply(&mut self, input: ClientInput) -> Result<Step, ChatError> {
        match input {
            ClientInput::Connect => Ok(self.on_connect()),
            ClientInput::Disconnect => Ok(self.on_disconnect()),
            ClientInput::Liveness(live) => {
                self.require_attached("liveness")?;
                let next = crate::liveness_state(live);
                Ok(self.transition(next, Directive::None))
            }
            ClientInput::Send => {
                if self.state.is_connected() {
                    Ok(Step {
                        changed: None,
                        directive: Directive::Submit,
                    })
                } else {
                    Err(ChatError::invalid_state(self.state, "send_message"))
                }
            }
            ClientInput::WriteFailed(reason) => {
                self.require_attached("write_failed")?;
                Ok(self.transition(ConnectionState::Failed(reason), Directive::None))
            }
        }
    }

    fn on_connect(&mut self) -> Step {
        match self.state {
            ConnectionState::Connected | ConnectionState::Connecting => Step::idle(),
            ConnectionState::Disconnected | ConnectionState::Failed(_) => {
                let directive = if self.attached {
                    Directive::Reattach
                } else {
                    Directive::Attach
                };
                self.attached = true;
                self.transition(ConnectionState::Connecting, directive)
            }
        }
    }

    fn on_disconnect(&mut self) -> Step {
        let directive = if self.attached {
            Directive::Detach
        } else {
            Directive::None
        };
        self.attached = false;
        self.transition(ConnectionState::Disconnected, directive)
    }

    fn require_attached(&self, action: &str) -> Result<(), ChatError> {
        if self.attached {
            Ok(())
        } else {
            Err(ChatError::invalid_state(self.state, action))
        }
    }

    fn transition(&mut self, next: ConnectionState, directive: Directive) -> Step {
        let changed = (self.state != next).then_some(next);
        self.state = next;
        Step { changed, directive }
    }
}
