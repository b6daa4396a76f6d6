use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::state::RecorderState;
use super::stats::SessionCounters;
use crate::audio::{AudioBackend, AudioFrame, AudioSlice, AudioSlicer, SliceConfig};
use crate::error::{ClientError, Result};
use crate::transport::FrameSink;

/// Creates a fresh capture backend for each recording run
pub type BackendFactory = Box<dyn Fn() -> anyhow::Result<Box<dyn AudioBackend>> + Send + Sync>;

/// Captures audio and streams it to the connection as fixed-duration slices
pub struct AudioStreamer {
    factory: BackendFactory,
    slice_config: SliceConfig,
    state: RecorderState,
    backend: Option<Box<dyn AudioBackend>>,
    forwarder: Option<JoinHandle<()>>,
    /// Epoch of the live recording run; bumped on every start and stop
    epoch: Arc<AtomicU64>,
    counters: Arc<SessionCounters>,
    /// Epochs whose capture source ran dry on its own
    ended_tx: mpsc::UnboundedSender<u64>,
    ended_rx: mpsc::UnboundedReceiver<u64>,
}

impl AudioStreamer {
    pub fn new(factory: BackendFactory, slice_config: SliceConfig, counters: Arc<SessionCounters>) -> Self {
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        Self {
            factory,
            slice_config,
            state: RecorderState::Idle,
            backend: None,
            forwarder: None,
            epoch: Arc::new(AtomicU64::new(0)),
            counters,
            ended_tx,
            ended_rx,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Whether a capture device is currently held
    pub fn holds_device(&self) -> bool {
        self.backend.is_some()
    }

    /// Start if idle, stop if recording
    ///
    /// Failures are logged and leave the streamer idle.
    pub async fn toggle(&mut self, sink: Arc<dyn FrameSink>) -> RecorderState {
        let result = if self.state.is_recording() {
            self.stop().await
        } else {
            self.start(sink).await
        };

        if let Err(e) = result {
            error!("Error accessing microphone: {}", e);
        }

        self.state
    }

    /// Start capturing and streaming slices to `sink`
    pub async fn start(&mut self, sink: Arc<dyn FrameSink>) -> Result<()> {
        if self.state.is_recording() {
            return Err(ClientError::InvalidTransition {
                action: "start recording",
                state: self.state.name(),
            });
        }

        let mut backend = (self.factory)().map_err(|e| ClientError::AudioDevice(format!("{:#}", e)))?;
        info!("Starting recording with {} backend", backend.name());

        let frames = backend
            .start()
            .await
            .map_err(|e| ClientError::AudioDevice(format!("{:#}", e)))?;

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let forwarder = SliceForwarder {
            slicer: AudioSlicer::new(self.slice_config.clone()),
            sink,
            epoch,
            live_epoch: Arc::clone(&self.epoch),
            counters: Arc::clone(&self.counters),
            ended_tx: self.ended_tx.clone(),
        };

        self.forwarder = Some(tokio::spawn(forwarder.run(frames)));
        self.backend = Some(backend);
        self.state = RecorderState::Recording {
            started_at: Utc::now(),
            epoch,
        };

        info!(
            "Recorder started (epoch {}, {}ms slices)",
            epoch, self.slice_config.slice_ms
        );

        Ok(())
    }

    /// Stop capturing, release the device, and discard any slice still in flight
    pub async fn stop(&mut self) -> Result<()> {
        if !self.state.is_recording() {
            return Err(ClientError::InvalidTransition {
                action: "stop recording",
                state: self.state.name(),
            });
        }

        // Invalidate the running epoch before anything else can deliver
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state = RecorderState::Idle;

        let mut result = Ok(());
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop {} backend: {}", backend.name(), e);
                result = Err(ClientError::AudioDevice(format!("{:#}", e)));
            }
        }

        if let Some(task) = self.forwarder.take() {
            task.abort();
            let _ = task.await;
        }

        info!("Recorder stopped");

        result
    }

    /// Wait until a recording run's capture source ends on its own
    ///
    /// Yields the epoch of that run. Pair with `finish_source`.
    pub async fn source_ended(&mut self) -> Option<u64> {
        self.ended_rx.recv().await
    }

    /// Release the device of a run whose source ended
    ///
    /// Returns false when `epoch` is no longer the live run.
    pub async fn finish_source(&mut self, epoch: u64) -> bool {
        match self.state {
            RecorderState::Recording { epoch: live, .. } if live == epoch => {}
            _ => return false,
        }

        info!("Capture source ended (epoch {})", epoch);
        if let Err(e) = self.stop().await {
            warn!("Failed to release capture source: {}", e);
        }
        true
    }
}

/// Per-run task that slices captured frames and writes them to the connection
struct SliceForwarder {
    slicer: AudioSlicer,
    sink: Arc<dyn FrameSink>,
    epoch: u64,
    live_epoch: Arc<AtomicU64>,
    counters: Arc<SessionCounters>,
    ended_tx: mpsc::UnboundedSender<u64>,
}

impl SliceForwarder {
    fn is_current(&self) -> bool {
        self.live_epoch.load(Ordering::SeqCst) == self.epoch
    }

    async fn run(mut self, mut frames: mpsc::Receiver<AudioFrame>) {
        debug!("Slice forwarder started (epoch {})", self.epoch);

        while let Some(frame) = frames.recv().await {
            if !self.is_current() {
                break;
            }

            let slices = match self.slicer.push(&frame) {
                Ok(slices) => slices,
                Err(e) => {
                    error!("Failed to package audio slice: {:#}", e);
                    continue;
                }
            };

            for slice in slices {
                self.deliver(slice).await;
            }
        }

        // Source ran dry on its own; send the tail unless we were stopped
        if self.is_current() {
            match self.slicer.flush() {
                Ok(Some(tail)) => self.deliver(tail).await,
                Ok(None) => {}
                Err(e) => error!("Failed to package final audio slice: {:#}", e),
            }
            let _ = self.ended_tx.send(self.epoch);
        }

        debug!("Slice forwarder finished (epoch {})", self.epoch);
    }

    async fn deliver(&self, slice: AudioSlice) {
        if !self.is_current() {
            debug!("Discarding slice {} from stopped recording", slice.index);
            return;
        }

        if !self.sink.is_open() {
            self.counters.record_dropped();
            debug!("Connection not open, dropping slice {}", slice.index);
            return;
        }

        let len = slice.bytes.len();
        match self.sink.send_binary(slice.bytes).await {
            Ok(()) => {
                self.counters.record_sent(len);
                debug!(
                    "Sent slice {} ({}-{}ms, {} bytes)",
                    slice.index, slice.start_ms, slice.end_ms, len
                );
            }
            Err(e) => {
                self.counters.record_dropped();
                warn!("Failed to send slice {}: {}", slice.index, e);
            }
        }
    }
}
