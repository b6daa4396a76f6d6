use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::messages::{ChatMessage, ControlMessage};
use crate::error::{ClientError, Result};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Build the chat endpoint URL for a host, upgrading to wss when secure
pub fn endpoint_url(host: &str, path: &str, secure: bool) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    format!("{}://{}{}", scheme, host.trim_end_matches('/'), path)
}

/// Readiness of a connection, mirroring the WebSocket ready states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// Connection state shared between the writer and the reader task
#[derive(Debug, Clone)]
pub struct SharedConnectionState(Arc<AtomicU8>);

impl SharedConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(Arc::new(AtomicU8::new(state as u8)))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// Outbound half of a chat connection
#[async_trait::async_trait]
pub trait FrameSink: Send + Sync {
    /// Whether frames can be written right now
    fn is_open(&self) -> bool;

    /// Send a JSON control message as a text frame
    async fn send_control(&self, message: &ControlMessage) -> Result<()>;

    /// Send raw bytes as a binary frame
    async fn send_binary(&self, bytes: Vec<u8>) -> Result<()>;

    /// Start the closing handshake
    async fn close(&self) -> Result<()>;
}

/// An open connection: the outbound sink plus the inbound message stream
pub struct Connection {
    pub sink: Arc<dyn FrameSink>,
    pub inbound: mpsc::Receiver<ChatMessage>,
    pub reader: JoinHandle<()>,
}

/// Opens chat connections
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Connection>;
}

/// Connector backed by tokio-tungstenite
pub struct WsConnector {
    message_buffer: usize,
}

impl WsConnector {
    pub fn new(message_buffer: usize) -> Self {
        Self {
            message_buffer: message_buffer.max(1),
        }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection> {
        info!("Connecting to {}", url);

        let (stream, _response) = connect_async(url).await?;
        let (sink, mut source) = stream.split();

        let state = SharedConnectionState::new(ConnectionState::Open);
        info!("Connected to {}", url);

        let (tx, inbound) = mpsc::channel(self.message_buffer);
        let reader_state = state.clone();

        let reader = tokio::spawn(async move {
            debug!("Inbound reader started");

            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ChatMessage>(text.as_str()) {
                        Ok(message) => {
                            if tx.send(message).await.is_err() {
                                debug!("Inbound receiver dropped");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse inbound message: {}", e);
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        info!("Server closed the connection: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Connection read error: {}", e);
                        break;
                    }
                }
            }

            reader_state.set(ConnectionState::Closed);
            debug!("Inbound reader stopped");
        });

        Ok(Connection {
            sink: Arc::new(ChatConnection {
                sink: Mutex::new(sink),
                state,
            }),
            inbound,
            reader,
        })
    }
}

/// Write half of a WebSocket chat connection
pub struct ChatConnection {
    sink: Mutex<WsSink>,
    state: SharedConnectionState,
}

impl ChatConnection {
    async fn send(&self, message: Message) -> Result<()> {
        if !self.is_open() {
            return Err(ClientError::Connection(format!(
                "connection is {:?}",
                self.state.get()
            )));
        }

        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(message).await {
            self.state.set(ConnectionState::Closed);
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl FrameSink for ChatConnection {
    fn is_open(&self) -> bool {
        self.state.get() == ConnectionState::Open
    }

    async fn send_control(&self, message: &ControlMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        debug!("Sending control message: {}", json);
        self.send(Message::Text(json.into())).await
    }

    async fn send_binary(&self, bytes: Vec<u8>) -> Result<()> {
        self.send(Message::Binary(bytes.into())).await
    }

    async fn close(&self) -> Result<()> {
        if self.state.get() != ConnectionState::Open {
            return Ok(());
        }

        info!("Closing connection");
        self.state.set(ConnectionState::Closing);

        let mut sink = self.sink.lock().await;
        let result = sink.close().await;
        self.state.set(ConnectionState::Closed);
        result.map_err(ClientError::from)
    }
}
