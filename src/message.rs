//! Chat message definition
//!
//! The single value type relayed between clients, encoded as a JSON object
//! (`{"author": ..., "content": ...}`) on the wire. Capitalised keys
//! (`Author`, `Content`) are accepted too, and a missing field decodes as "".

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A chat message as sent by one client and fanned out to its room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Identity of the sender, as supplied by the client
    #[serde(default, alias = "Author")]
    pub author: String,
    /// Message body
    #[serde(default, alias = "Content")]
    pub content: String,
}

impl ChatMessage {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
        }
    }

    /// Decode a message from a JSON text frame
    pub fn from_json(text: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode this message as a JSON text frame
    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }
}
