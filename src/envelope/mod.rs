pub mod codec;
pub mod error;
pub mod kind;
pub mod message;

pub use error::EnvelopeError;
pub use kind::MessageKind;
pub use message::{EnvelopeBuilder, MessageEnvelope};
