use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use voicechat::{
    AudioSource, ChatSession, Config, JoinOutcome, SessionConfig, SessionEvent, TerminalRenderer,
    WsConnector,
};

/// Live-transcription voice chat client
#[derive(Debug, Parser)]
#[command(name = "voicechat", version)]
struct Args {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/voicechat")]
    config: String,

    /// Chat server host and port, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Connect with wss:// instead of ws://
    #[arg(long)]
    secure: bool,

    /// Join immediately with this username instead of prompting
    #[arg(long)]
    username: Option<String>,

    /// Stream a WAV file instead of the microphone
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// Log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = Config::load(&args.config)?;
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if args.secure {
        cfg.server.secure = true;
    }

    let source = match args.input_file {
        Some(path) => AudioSource::File(path),
        None => AudioSource::Microphone,
    };

    let session_config = SessionConfig::from_config(&cfg, source);
    info!("voicechat v{}", env!("CARGO_PKG_VERSION"));
    info!("Chat endpoint: {}", session_config.endpoint);
    info!("Audio source: {:?}", session_config.audio_source);

    let connector = Arc::new(WsConnector::new(cfg.client.message_buffer));
    let mut session = ChatSession::new(session_config, connector);
    let mut screen = TerminalRenderer::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    screen.draw_panel(session.view())?;

    // Login: keep asking until a join succeeds
    let mut pending = args.username;
    loop {
        let username = match pending.take() {
            Some(name) => name,
            None => match lines.next_line().await.context("Failed to read stdin")? {
                Some(line) => line,
                None => return Ok(()),
            },
        };

        match session.join(&username).await {
            Ok(JoinOutcome::Joined { .. }) => break,
            Ok(JoinOutcome::Ignored) => {}
            Err(e) => {
                error!("Failed to join: {}", e);
                screen.notice(&format!("Could not join: {}", e))?;
            }
        }
    }

    screen.draw_panel(session.view())?;

    loop {
        tokio::select! {
            event = session.next_event() => {
                match event {
                    Some(SessionEvent::Message(message)) => {
                        let update = session.handle_message(message);
                        screen.draw_update(&session.view().messages, &update)?;
                    }
                    Some(SessionEvent::RecordingEnded) => {
                        screen.notice("Audio source finished.")?;
                        screen.draw_label(session.view())?;
                    }
                    None => {
                        screen.notice("Disconnected from server.")?;
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                let line = line.context("Failed to read stdin")?;
                match line.as_deref().map(str::trim) {
                    None | Some("/quit") => break,
                    Some("/stats") => {
                        let stats = serde_json::to_string_pretty(&session.stats())?;
                        screen.notice(&stats)?;
                    }
                    Some("") | Some("r") => {
                        session.toggle_recording().await;
                        screen.draw_label(session.view())?;
                    }
                    Some(other) => {
                        screen.notice(&format!("Unknown command: {}", other))?;
                    }
                }
            }
        }
    }

    let stats = session.close().await?;
    info!(
        "Session summary: {:.1}s, {} slices sent ({} bytes), {} dropped, {} messages",
        stats.duration_secs,
        stats.slices_sent,
        stats.bytes_sent,
        stats.slices_dropped,
        stats.messages_received
    );

    Ok(())
}
