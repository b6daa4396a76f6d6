//! Error types for the chat client

use thiserror::Error;

/// Errors surfaced by the chat client
#[derive(Error, Debug)]
pub enum ClientError {
    /// The WebSocket connection could not be opened or broke while in use
    #[error("Connection error: {0}")]
    Connection(String),

    /// A frame could not be encoded or decoded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Capture device unavailable, denied, or failed mid-stream
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Audio slice could not be packaged
    #[error("Audio encode error: {0}")]
    Encode(String),

    /// A state transition was requested from the wrong state
    #[error("Invalid transition: cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Connection(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Protocol(e.to_string())
    }
}

impl From<hound::Error> for ClientError {
    fn from(e: hound::Error) -> Self {
        ClientError::Encode(e.to_string())
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(e: config::ConfigError) -> Self {
        ClientError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
