pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;
pub mod ui;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSlice,
    AudioSlicer, AudioSource, FileBackend, SliceConfig,
};
pub use config::Config;
pub use error::ClientError;
pub use session::{
    ChatSession, JoinOutcome, RecorderState, SessionConfig, SessionEvent, SessionState, SessionStats,
};
pub use transport::{ChatMessage, ControlMessage, FrameSink, WsConnector};
pub use ui::{ClientView, MessageList, TerminalRenderer};
