//! The chat message and its wire frame.

use serde::{Deserialize, Serialize};

use crate::{ConversationKey, Identity, TypesError};

/// One text message from `sender` to `receiver`.
///
/// No timestamp or sequence number is carried; ordering is whatever order
/// the receiving mailbox hands messages out in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub sender: Identity,
    /// Whose mailbox it is addressed to.
    pub receiver: Identity,
    /// The text itself.
    pub content: String,
}

impl Message {
    /// Create a new message.
    pub fn new(sender: Identity, receiver: Identity, content: impl Into<String>) -> Self {
        Self {
            sender,
            receiver,
            content: content.into(),
        }
    }

    /// The conversation this message belongs to.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(&self.sender, &self.receiver)
    }

    /// The history line for this message: `"<sender>: <content>"`.
    pub fn history_line(&self) -> String {
        format!("{}: {}", self.sender, self.content)
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        rmp_serde::to_vec(self).map_err(TypesError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        rmp_serde::from_slice(bytes).map_err(TypesError::Deserialization)
    }
}
