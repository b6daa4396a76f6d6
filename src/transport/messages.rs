use serde::{Deserialize, Serialize};

/// Message kind for an in-progress transcript line
pub const KIND_PARTIAL: &str = "partial";

/// Control messages sent by the client as JSON text frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Announces the user to the chat room; sent once, right after connect
    Join { username: String },
}

/// Chat or transcript line received from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "partial", "final", or any other kind the server sends
    #[serde(rename = "type")]
    pub kind: String,
    pub username: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(kind: impl Into<String>, username: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            username: username.into(),
            text: text.into(),
        }
    }

    /// Whether this line is superseded by the sender's next line
    pub fn is_partial(&self) -> bool {
        self.kind == KIND_PARTIAL
    }
}
