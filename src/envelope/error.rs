use thiserror::Error;

/// Errors raised while building or decoding a [`MessageEnvelope`](super::MessageEnvelope).
///
/// Both variants are local and recoverable: the caller rejects the input
/// (or drops the frame) and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Field contracts were violated at construction or mutation time.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
    /// Wire bytes could not be parsed into a valid envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

impl EnvelopeError {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::InvalidEnvelope(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedEnvelope(_))
    }
}
