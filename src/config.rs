use anyhow::Result;
use serde::Deserialize;

use crate::error::ClientError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host and port of the chat server, e.g. "127.0.0.1:8080"
    pub host: String,
    /// Use wss:// instead of ws://
    pub secure: bool,
    /// Socket path on the host
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate of streamed slices (always mono)
    pub sample_rate: u32,
    /// Duration of each streamed slice
    pub slice_ms: u64,
    /// Target bitrate, reported in logs
    pub bits_per_second: u32,
    /// Capture buffer duration
    pub buffer_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Capacity of the inbound message and audio frame channels
    pub message_buffer: usize,
}

impl Config {
    /// Load config from an optional file at `path` plus `VOICECHAT__*` env vars,
    /// layered over the built-in defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOICECHAT").separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject audio settings that cannot produce a slice
    pub fn validate(&self) -> std::result::Result<(), ClientError> {
        if self.audio.sample_rate == 0 {
            return Err(ClientError::Config("audio.sample_rate must be greater than 0".to_string()));
        }
        if self.audio.slice_ms == 0 {
            return Err(ClientError::Config("audio.slice_ms must be greater than 0".to_string()));
        }
        Ok(())
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("server.host", "127.0.0.1:8080")?
            .set_default("server.secure", false)?
            .set_default("server.path", "/ws")?
            .set_default("audio.sample_rate", 44100)?
            .set_default("audio.slice_ms", 250)?
            .set_default("audio.bits_per_second", 128000)?
            .set_default("audio.buffer_ms", 50)?
            .set_default("client.message_buffer", 100)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1:8080".to_string(),
                secure: false,
                path: "/ws".to_string(),
            },
            audio: AudioConfig {
                sample_rate: 44100,
                slice_ms: 250,
                bits_per_second: 128000,
                buffer_ms: 50,
            },
            client: ClientConfig { message_buffer: 100 },
        }
    }
}
