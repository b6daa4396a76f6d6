use crate::audio::{AudioBackendConfig, AudioSource, SliceConfig};
use crate::config::Config;
use crate::transport::endpoint_url;

/// Configuration for a chat session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session identifier for log correlation
    pub session_id: String,

    /// Chat endpoint, e.g. "ws://127.0.0.1:8080/ws"
    pub endpoint: String,

    /// Where recorded audio comes from
    pub audio_source: AudioSource,

    /// Capture backend settings
    pub backend: AudioBackendConfig,

    /// Slice duration and output rate
    pub slice: SliceConfig,

    /// Target bitrate, reported when recording starts
    pub bits_per_second: u32,
}

impl SessionConfig {
    pub fn from_config(config: &Config, audio_source: AudioSource) -> Self {
        Self {
            endpoint: endpoint_url(&config.server.host, &config.server.path, config.server.secure),
            audio_source,
            backend: AudioBackendConfig {
                target_sample_rate: config.audio.sample_rate,
                target_channels: 1,
                buffer_duration_ms: config.audio.buffer_ms,
                channel_capacity: config.client.message_buffer,
            },
            slice: SliceConfig {
                slice_ms: config.audio.slice_ms,
                sample_rate: config.audio.sample_rate,
            },
            bits_per_second: config.audio.bits_per_second,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("chat-{}", uuid::Uuid::new_v4()),
            endpoint: "ws://127.0.0.1:8080/ws".to_string(),
            audio_source: AudioSource::Microphone,
            backend: AudioBackendConfig::default(),
            slice: SliceConfig::default(),
            bits_per_second: 128000,
        }
    }
}
