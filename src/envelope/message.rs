use std::fmt;

use super::{EnvelopeError, MessageKind};

/// One unit of chat communication.
///
/// Fields are private so every value in circulation has passed validation:
/// a recognized kind, a non-empty sender, and non-empty content for
/// [`MessageKind::Chat`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageEnvelope {
    kind: MessageKind,
    content: String,
    sender: String,
}

impl MessageEnvelope {
    /// Build a validated envelope.
    pub fn new(
        kind: MessageKind,
        content: impl Into<String>,
        sender: impl Into<String>,
    ) -> Result<Self, EnvelopeError> {
        let envelope = Self {
            kind,
            content: content.into(),
            sender: sender.into(),
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// Build an envelope from an untyped kind name, e.g. one supplied on a command line.
    pub fn from_parts(
        kind: &str,
        content: impl Into<String>,
        sender: impl Into<String>,
    ) -> Result<Self, EnvelopeError> {
        Self::new(kind.parse()?, content, sender)
    }

    pub fn chat(sender: impl Into<String>, content: impl Into<String>) -> Result<Self, EnvelopeError> {
        Self::new(MessageKind::Chat, content, sender)
    }

    pub fn join(sender: impl Into<String>) -> Result<Self, EnvelopeError> {
        Self::new(MessageKind::Join, String::new(), sender)
    }

    pub fn leave(sender: impl Into<String>) -> Result<Self, EnvelopeError> {
        Self::new(MessageKind::Leave, String::new(), sender)
    }

    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn into_parts(self) -> (MessageKind, String, String) {
        (self.kind, self.content, self.sender)
    }

    pub fn set_kind(&mut self, kind: MessageKind) -> Result<(), EnvelopeError> {
        self.commit(|candidate| candidate.kind = kind)
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> Result<(), EnvelopeError> {
        let content = content.into();
        self.commit(|candidate| candidate.content = content)
    }

    pub fn set_sender(&mut self, sender: impl Into<String>) -> Result<(), EnvelopeError> {
        let sender = sender.into();
        self.commit(|candidate| candidate.sender = sender)
    }

    pub fn with_kind(self, kind: MessageKind) -> Result<Self, EnvelopeError> {
        Self::new(kind, self.content, self.sender)
    }

    pub fn with_content(self, content: impl Into<String>) -> Result<Self, EnvelopeError> {
        Self::new(self.kind, content, self.sender)
    }

    pub fn with_sender(self, sender: impl Into<String>) -> Result<Self, EnvelopeError> {
        Self::new(self.kind, self.content, sender)
    }

    // The change lands on a copy; `self` only moves once the copy validates.
    fn commit(&mut self, apply: impl FnOnce(&mut Self)) -> Result<(), EnvelopeError> {
        let mut candidate = self.clone();
        apply(&mut candidate);
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    fn validate(&self) -> Result<(), EnvelopeError> {
        if self.sender.is_empty() {
            return Err(EnvelopeError::InvalidEnvelope(
                "sender must not be empty".to_string(),
            ));
        }
        if self.kind.requires_content() && self.content.is_empty() {
            return Err(EnvelopeError::InvalidEnvelope(format!(
                "content must not be empty for {}",
                self.kind
            )));
        }
        Ok(())
    }
}

impl fmt::Display for MessageEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MessageKind::Chat => write!(f, "{}: {}", self.sender, self.content),
            MessageKind::Join => write!(f, "{} joined", self.sender),
            MessageKind::Leave => write!(f, "{} left", self.sender),
        }
    }
}

/// Step-by-step construction; validation happens once, in [`EnvelopeBuilder::build`].
#[derive(Debug, Default, Clone)]
pub struct EnvelopeBuilder {
    kind: Option<MessageKind>,
    content: Option<String>,
    sender: Option<String>,
}

impl EnvelopeBuilder {
    pub fn kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn build(self) -> Result<MessageEnvelope, EnvelopeError> {
        let kind = self
            .kind
            .ok_or_else(|| EnvelopeError::InvalidEnvelope("kind is required".to_string()))?;
        let sender = self
            .sender
            .ok_or_else(|| EnvelopeError::InvalidEnvelope("sender is required".to_string()))?;
        MessageEnvelope::new(kind, self.content.unwrap_or_default(), sender)
    }
}
