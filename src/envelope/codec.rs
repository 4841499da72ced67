//! Wire representation of [`MessageEnvelope`].
//!
//! A frame is a compact UTF-8 JSON object with exactly three members, always
//! written in the order `type`, `content`, `sender`:
//!
//! ```text
//! {"type":"CHAT","content":"hello","sender":"alice"}
//! ```
//!
//! `type` is the upper-case kind tag. Decoding rejects missing, duplicate and
//! unknown members, unknown tags, and anything trailing the object.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::{EnvelopeError, MessageEnvelope, MessageKind};

/// On-the-wire record. Field declaration order is the encoded member order.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEnvelope<'a> {
    #[serde(rename = "type")]
    kind: MessageKind,
    content: Cow<'a, str>,
    sender: Cow<'a, str>,
}

impl MessageEnvelope {
    /// Serialize to the wire format. Identical envelopes always produce identical bytes.
    pub fn encode(&self) -> Vec<u8> {
        let wire = WireEnvelope {
            kind: self.kind(),
            content: Cow::Borrowed(self.content()),
            sender: Cow::Borrowed(self.sender()),
        };
        // A unit enum and two strings have no failing serialization path.
        serde_json::to_vec(&wire).expect("envelope fields always serialize to JSON")
    }

    /// Parse a frame produced by [`MessageEnvelope::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let wire: WireEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| EnvelopeError::MalformedEnvelope(e.to_string()))?;

        MessageEnvelope::new(wire.kind, wire.content, wire.sender).map_err(|e| match e {
            EnvelopeError::InvalidEnvelope(reason) => EnvelopeError::MalformedEnvelope(reason),
            other => other,
        })
    }
}
