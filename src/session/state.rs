use chrono::{DateTime, Utc};

/// Lifecycle of a chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet joined; the login panel is showing
    Created,
    /// Joined and connected
    Active,
    /// Connection closed, by us or by the server
    Closed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        }
    }
}

/// Recording state of the audio streamer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Not recording; no capture device held
    Idle,
    /// Capturing and streaming slices
    Recording {
        /// When recording started
        started_at: DateTime<Utc>,
        /// Recording run this state belongs to; slices from other epochs are discarded
        epoch: u64,
    },
}

impl RecorderState {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecorderState::Recording { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::Recording { .. } => "recording",
        }
    }
}
