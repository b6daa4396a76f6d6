//! Message list model
//!
//! Holds the rendered chat/transcript lines in arrival order. A partial line
//! is a placeholder for a sender's in-progress transcript: the sender's next
//! line, partial or final, replaces it.

use std::fmt;

use crate::transport::ChatMessage;

/// One line in the message list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub username: String,
    pub kind: String,
    pub text: String,
}

impl RenderedLine {
    pub fn is_partial(&self) -> bool {
        self.kind == crate::transport::KIND_PARTIAL
    }
}

impl fmt::Display for RenderedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.username, self.text)
    }
}

impl From<ChatMessage> for RenderedLine {
    fn from(message: ChatMessage) -> Self {
        Self {
            username: message.username,
            kind: message.kind,
            text: message.text,
        }
    }
}

/// What a single `apply` changed, for incremental drawing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderUpdate {
    /// Position of the partial line that was removed, if any
    pub removed_partial: Option<usize>,
    /// Position of the newly appended line
    pub appended_at: usize,
}

#[derive(Debug, Default)]
pub struct MessageList {
    lines: Vec<RenderedLine>,
    scrolled_to: Option<usize>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render an inbound message: drop the sender's pending partial, append, scroll to it
    pub fn apply(&mut self, message: ChatMessage) -> RenderUpdate {
        let removed_partial = self
            .lines
            .iter()
            .position(|line| line.is_partial() && line.username == message.username);

        if let Some(index) = removed_partial {
            self.lines.remove(index);
        }

        self.lines.push(message.into());
        let appended_at = self.lines.len() - 1;
        self.scrolled_to = Some(appended_at);

        RenderUpdate {
            removed_partial,
            appended_at,
        }
    }

    pub fn lines(&self) -> &[RenderedLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the line the view is scrolled to
    pub fn scrolled_to(&self) -> Option<usize> {
        self.scrolled_to
    }

    /// The pending partial line for a user, if one is shown
    pub fn partial_for(&self, username: &str) -> Option<&RenderedLine> {
        self.lines
            .iter()
            .find(|line| line.is_partial() && line.username == username)
    }
}
