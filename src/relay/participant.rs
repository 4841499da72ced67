use std::fmt;
use uuid::Uuid;

use super::RelayError;

/// A connected party as seen by the relay.
///
/// The relay, not the client, owns sender identity: every envelope accepted
/// from this connection carries `name` as its sender. Fields are private, so
/// every participant has passed [`validate_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Participant {
    connection_id: Uuid,
    name: String,
}

impl Participant {
    /// Create a participant with a fresh connection id.
    pub(crate) fn new(name: &str, max_name_len: usize) -> Result<Self, RelayError> {
        let name = validate_name(name, max_name_len)?;
        Ok(Self {
            connection_id: Uuid::new_v4(),
            name: name.to_string(),
        })
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.connection_id)
    }
}

/// Trim `name` and check it: non-empty, at most `max_name_len` characters, no `@`.
pub(crate) fn validate_name(name: &str, max_name_len: usize) -> Result<&str, RelayError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RelayError::InvalidName("name must not be empty".to_string()));
    }
    if name.chars().count() > max_name_len {
        return Err(RelayError::InvalidName(format!(
            "'{name}' is longer than {max_name_len} characters"
        )));
    }
    if name.contains('@') {
        return Err(RelayError::InvalidName(format!("'{name}' contains '@'")));
    }
    Ok(name)
}
