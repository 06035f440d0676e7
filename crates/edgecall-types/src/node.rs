//! Opaque identifiers for destination edge nodes.

use crate::error::EdgeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a destination edge node (a content-addressed peer ID).
///
/// The value is treated as opaque: it is compared by exact string equality
/// and its internal structure is never parsed here. Addressing belongs to the
/// transport. Construction only rejects values that cannot be a peer ID at
/// all (empty, or containing whitespace or control characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Validate and wrap a node identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, EdgeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(EdgeError::InvalidInput("node id is empty".to_string()));
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(EdgeError::InvalidInput(format!(
                "node id contains whitespace or control characters: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NodeId {
    type Error = EdgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NodeId {
    type Error = EdgeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
