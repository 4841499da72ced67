use std::fmt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::Participant;
use crate::envelope::{EnvelopeError, MessageEnvelope};

/// An envelope with its position in the relay's total order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequenced {
    pub seq: u64,
    pub envelope: MessageEnvelope,
}

impl fmt::Display for Sequenced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.seq, self.envelope)
    }
}

/// Commands that can be sent to the background relay task
#[derive(Debug)]
pub enum RelayCommand {
    /// Register a participant; the assigned identity (or the rejection) comes back on `reply`.
    Join {
        name: String,
        reply: oneshot::Sender<Result<Participant, RelayError>>,
    },
    Send {
        connection_id: Uuid,
        frame: Vec<u8>,
    },
    Leave {
        connection_id: Uuid,
    },
    /// Receive every delivery made after this command is processed.
    Subscribe(mpsc::UnboundedSender<Sequenced>),
    Shutdown,
}

/// Events that the background relay task sends back to the service owner
#[derive(Debug, Clone)]
pub enum RelayEvent {
    Joined(Participant),
    Delivered(Sequenced),
    Rejected {
        connection_id: Uuid,
        error: RelayError,
    },
    Left(Participant),
}

/// Relay error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("unknown connection {0}")]
    UnknownConnection(Uuid),
    #[error("invalid participant name: {0}")]
    InvalidName(String),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("relay channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequenced_display() {
        let sequenced = Sequenced {
            seq: 7,
            envelope: MessageEnvelope::chat("alice", "hello").unwrap(),
        };
        assert_eq!(sequenced.to_string(), "#7 alice: hello");
    }

    #[test]
    fn test_envelope_error_converts() {
        let err: RelayError = EnvelopeError::MalformedEnvelope("eof".to_string()).into();
        assert_eq!(err.to_string(), "malformed envelope: eof");
    }
}
