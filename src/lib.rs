//! Chat message envelopes: validation, a stable wire format, and an
//! in-process relay that sequences them for delivery.

pub mod config;
pub mod envelope;
pub mod relay;

pub use envelope::{EnvelopeBuilder, EnvelopeError, MessageEnvelope, MessageKind};
