use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::EnvelopeError;

/// Semantic category of an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    /// Ordinary chat message.
    Chat,
    /// Participant entered.
    Join,
    /// Participant left.
    Leave,
}

impl MessageKind {
    pub const ALL: [MessageKind; 3] = [MessageKind::Chat, MessageKind::Join, MessageKind::Leave];

    /// Tag used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Chat => "CHAT",
            MessageKind::Join => "JOIN",
            MessageKind::Leave => "LEAVE",
        }
    }

    /// Presence events may carry empty content.
    pub fn requires_content(&self) -> bool {
        matches!(self, MessageKind::Chat)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EnvelopeError::InvalidEnvelope(format!("unrecognized kind '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        assert_eq!("CHAT".parse::<MessageKind>().unwrap(), MessageKind::Chat);
        assert_eq!("JOIN".parse::<MessageKind>().unwrap(), MessageKind::Join);
        assert_eq!("LEAVE".parse::<MessageKind>().unwrap(), MessageKind::Leave);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        let err = "chat".parse::<MessageKind>().unwrap_err();
        assert!(err.is_invalid());
        assert!("TYPING".parse::<MessageKind>().is_err());
        assert!("".parse::<MessageKind>().is_err());
    }

    #[test]
    fn test_display_matches_wire_tag() {
        for kind in MessageKind::ALL {
            assert_eq!(kind.to_string().parse::<MessageKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_serde_tag() {
        let json = serde_json::to_string(&MessageKind::Leave).unwrap();
        assert_eq!(json, "\"LEAVE\"");
    }
}
