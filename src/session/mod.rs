//! Chat session management
//!
//! This module provides the `ChatSession` controller that manages:
//! - Joining the chat over a WebSocket connection
//! - Recording audio and streaming it as fixed-duration slices
//! - Rendering inbound chat and transcript lines
//! - Session statistics and lifecycle state

mod config;
mod session;
mod state;
mod stats;
mod streamer;

pub use config::SessionConfig;
pub use session::{ChatSession, JoinOutcome, SessionEvent};
pub use state::{RecorderState, SessionState};
pub use stats::{SessionCounters, SessionStats};
pub use streamer::{AudioStreamer, BackendFactory};
