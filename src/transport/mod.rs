pub mod client;
pub mod messages;

pub use client::{
    endpoint_url, ChatConnection, Connection, ConnectionState, Connector, FrameSink,
    SharedConnectionState, WsConnector,
};
pub use messages::{ChatMessage, ControlMessage, KIND_PARTIAL};
