// Microphone capture through cpal's default input device
//
// The cpal stream handle is not Send on every platform, so it lives on a
// dedicated capture thread that holds it until stop is signalled. Frames
// cross into tokio through a bounded channel with try_send from the device
// callback; a full channel drops the frame rather than blocking the device.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
        }
    }
}

/// Open the default input device and start a stream feeding `frame_tx`.
/// Returns the stream with the device's native rate and channel count.
fn open_input_stream(
    frame_tx: mpsc::Sender<AudioFrame>,
    capturing: Arc<AtomicBool>,
) -> Result<(cpal::Stream, u32, u16)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported = device
        .default_input_config()
        .context("Failed to get input config")?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;
    let started = Instant::now();

    let err_fn = |err| error!("Audio input stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !capturing.load(Ordering::SeqCst) {
                    return;
                }
                let samples = data
                    .iter()
                    .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                push_frame(&frame_tx, samples, sample_rate, channels, started);
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if !capturing.load(Ordering::SeqCst) {
                    return;
                }
                push_frame(&frame_tx, data.to_vec(), sample_rate, channels, started);
            },
            err_fn,
            None,
        ),
        other => bail!("Unsupported input sample format: {:?}", other),
    }
    .context("Failed to build input stream")?;

    stream.play().context("Failed to start input stream")?;

    Ok((stream, sample_rate, channels))
}

fn push_frame(
    frame_tx: &mpsc::Sender<AudioFrame>,
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    started: Instant,
) {
    let frame = AudioFrame {
        samples,
        sample_rate,
        channels,
        timestamp_ms: started.elapsed().as_millis() as u64,
    };

    if let Err(e) = frame_tx.try_send(frame) {
        debug!("Dropping microphone frame: {}", e);
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }

        info!(
            "Requesting microphone access (target {}Hz, {} channels)",
            self.config.target_sample_rate, self.config.target_channels
        );

        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(u32, u16)>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        self.capturing.store(true, Ordering::SeqCst);
        let capturing = Arc::clone(&self.capturing);

        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match open_input_stream(frame_tx, capturing) {
                    Ok((stream, rate, channels)) => {
                        let _ = ready_tx.send(Ok((rate, channels)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Hold the stream until stop is requested or the backend is dropped
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Microphone stream released");
            })
            .context("Failed to spawn capture thread")?;

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .context("Capture startup task panicked")?;

        match ready {
            Ok(Ok((rate, channels))) => {
                info!("Microphone capture started ({}Hz, {} channels)", rate, channels);
                self.stop_tx = Some(stop_tx);
                self.thread = Some(handle);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = handle.join();
                bail!("Capture thread exited before reporting readiness")
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Stopping microphone capture");

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(handle) = self.thread.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .context("Capture shutdown task panicked")?
                .map_err(|_| anyhow!("Capture thread panicked"))?;
        }

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "Microphone (cpal)"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}
