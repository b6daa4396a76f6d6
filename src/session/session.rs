use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::state::{RecorderState, SessionState};
use super::stats::{SessionCounters, SessionStats};
use super::streamer::{AudioStreamer, BackendFactory};
use crate::audio::AudioBackendFactory;
use crate::error::{ClientError, Result};
use crate::transport::{ChatMessage, Connector, ControlMessage, FrameSink};
use crate::ui::{ClientView, RenderUpdate};

/// How long `close` waits for the server to acknowledge the close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of a join attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Username was empty; nothing happened
    Ignored,
    /// Connected and announced
    Joined { username: String },
}

/// Something the front end should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A chat or transcript line arrived
    Message(ChatMessage),
    /// The capture source ran dry; recording is off and the device released
    RecordingEnded,
}

/// Live connection held by an active session
struct Link {
    sink: Arc<dyn FrameSink>,
    inbound: mpsc::Receiver<ChatMessage>,
    reader: JoinHandle<()>,
}

/// Client-side chat session: joins, streams audio, and renders inbound lines
pub struct ChatSession {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    state: SessionState,
    username: Option<String>,
    link: Option<Link>,
    streamer: AudioStreamer,
    view: ClientView,
    counters: Arc<SessionCounters>,
    joined_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    /// Create a session that captures from `config.audio_source`
    pub fn new(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        let source = config.audio_source.clone();
        let backend_config = config.backend.clone();
        let factory: BackendFactory =
            Box::new(move || AudioBackendFactory::create(source.clone(), backend_config.clone()));
        Self::with_backend_factory(config, connector, factory)
    }

    /// Create a session with a custom capture backend factory
    pub fn with_backend_factory(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        factory: BackendFactory,
    ) -> Self {
        let counters = Arc::new(SessionCounters::default());
        let streamer = AudioStreamer::new(factory, config.slice.clone(), Arc::clone(&counters));

        info!("Created chat session: {}", config.session_id);

        Self {
            config,
            connector,
            state: SessionState::Created,
            username: None,
            link: None,
            streamer,
            view: ClientView::new(),
            counters,
            joined_at: None,
        }
    }

    /// Join the chat as `username`
    ///
    /// An empty username is ignored without touching the connection or the view.
    /// Any other value is sent exactly as given.
    pub async fn join(&mut self, username: &str) -> Result<JoinOutcome> {
        if username.is_empty() {
            debug!("Ignoring join with empty username");
            return Ok(JoinOutcome::Ignored);
        }

        if self.state != SessionState::Created {
            return Err(ClientError::InvalidTransition {
                action: "join",
                state: self.state.name(),
            });
        }

        let connection = self.connector.connect(&self.config.endpoint).await?;
        let announce = ControlMessage::Join {
            username: username.to_string(),
        };
        if let Err(e) = connection.sink.send_control(&announce).await {
            connection.reader.abort();
            return Err(e);
        }

        self.view.show_chat();
        self.username = Some(username.to_string());
        self.link = Some(Link {
            sink: connection.sink,
            inbound: connection.inbound,
            reader: connection.reader,
        });
        self.state = SessionState::Active;
        self.joined_at = Some(Utc::now());

        info!(
            "Joined {} as {} (session {})",
            self.config.endpoint, username, self.config.session_id
        );

        Ok(JoinOutcome::Joined {
            username: username.to_string(),
        })
    }

    /// Flip recording on or off and relabel the record control
    ///
    /// Only meaningful once joined; device failures are logged and leave recording off.
    pub async fn toggle_recording(&mut self) -> RecorderState {
        let Some(sink) = self.active_sink() else {
            warn!("Cannot toggle recording: session is {}", self.state.name());
            return self.streamer.state();
        };

        let was_recording = self.streamer.state().is_recording();
        let state = self.streamer.toggle(sink).await;
        self.view.set_recording(state.is_recording());

        if state.is_recording() {
            info!(
                "Streaming {}ms slices at {}Hz mono (target {} bps)",
                self.config.slice.slice_ms, self.config.slice.sample_rate, self.config.bits_per_second
            );
        } else if was_recording {
            info!("Recording stopped");
        }

        state
    }

    /// Start recording; rejected if already recording or not joined
    pub async fn start_recording(&mut self) -> Result<()> {
        let sink = self.active_sink().ok_or(ClientError::InvalidTransition {
            action: "start recording",
            state: self.state.name(),
        })?;
        self.streamer.start(sink).await?;
        self.view.set_recording(true);
        Ok(())
    }

    /// Stop recording; rejected if not recording
    pub async fn stop_recording(&mut self) -> Result<()> {
        let result = self.streamer.stop().await;
        self.view.set_recording(self.streamer.state().is_recording());
        result
    }

    /// Wait for the next inbound message or the end of the capture source
    ///
    /// Returns `None` once the server side is gone; the session is then closed.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            let link = self.link.as_mut()?;
            let woke = tokio::select! {
                message = link.inbound.recv() => Ok(message),
                Some(epoch) = self.streamer.source_ended() => Err(epoch),
            };

            match woke {
                Ok(Some(message)) => return Some(SessionEvent::Message(message)),
                Ok(None) => {
                    info!("Connection closed by server");
                    self.mark_closed().await;
                    return None;
                }
                Err(epoch) => {
                    if self.streamer.finish_source(epoch).await {
                        self.view.set_recording(false);
                        return Some(SessionEvent::RecordingEnded);
                    }
                }
            }
        }
    }

    /// Wait for the next inbound message, handling source ends along the way
    pub async fn next_message(&mut self) -> Option<ChatMessage> {
        loop {
            match self.next_event().await? {
                SessionEvent::Message(message) => return Some(message),
                SessionEvent::RecordingEnded => {}
            }
        }
    }

    /// Render an inbound message into the view
    pub fn handle_message(&mut self, message: ChatMessage) -> RenderUpdate {
        debug!(
            "Received {} message from {}: {}",
            message.kind, message.username, message.text
        );
        self.counters.record_message();
        self.view.messages.apply(message)
    }

    /// Stop recording, close the connection, and return final stats
    pub async fn close(&mut self) -> Result<SessionStats> {
        if self.state == SessionState::Closed {
            return Ok(self.stats());
        }

        info!("Closing chat session: {}", self.config.session_id);

        if self.streamer.state().is_recording() {
            if let Err(e) = self.stop_recording().await {
                warn!("Failed to stop recording: {}", e);
            }
        }

        if let Some(link) = self.link.take() {
            if let Err(e) = link.sink.close().await {
                warn!("Failed to close connection cleanly: {}", e);
            }
            let mut reader = link.reader;
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut reader).await.is_err() {
                debug!("Reader did not finish in time, aborting");
                reader.abort();
            }
        }

        self.state = SessionState::Closed;
        let stats = self.stats();
        info!(
            "Session closed: {} slices sent, {} dropped, {} messages",
            stats.slices_sent, stats.slices_dropped, stats.messages_received
        );

        Ok(stats)
    }

    pub fn stats(&self) -> SessionStats {
        self.counters
            .snapshot(self.streamer.state().is_recording(), self.joined_at)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.streamer.state()
    }

    /// Whether the streamer still holds a capture device
    pub fn holds_capture_device(&self) -> bool {
        self.streamer.holds_device()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn view(&self) -> &ClientView {
        &self.view
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn active_sink(&self) -> Option<Arc<dyn FrameSink>> {
        match (&self.state, &self.link) {
            (SessionState::Active, Some(link)) => Some(Arc::clone(&link.sink)),
            _ => None,
        }
    }

    async fn mark_closed(&mut self) {
        if self.streamer.state().is_recording() {
            if let Err(e) = self.stop_recording().await {
                warn!("Failed to stop recording: {}", e);
            }
        }
        self.link = None;
        self.state = SessionState::Closed;
    }
}
