// End-to-end tests against a loopback WebSocket chat server
//
// The server side is a bare tokio-tungstenite acceptor so every frame the
// client writes can be inspected.

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use voicechat::audio::AudioSource;
use voicechat::session::{ChatSession, JoinOutcome, SessionConfig, SessionEvent, SessionState};
use voicechat::ui::START_LABEL;
use voicechat::transport::{Connector, WsConnector};

type ServerSocket = WebSocketStream<TcpStream>;

/// Bind a loopback listener and return it with the matching client config
async fn listen(source: AudioSource) -> Result<(TcpListener, SessionConfig)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let config = SessionConfig {
        endpoint: format!("ws://{}/ws", addr),
        audio_source: source,
        ..SessionConfig::default()
    };
    Ok((listener, config))
}

async fn accept(listener: &TcpListener) -> Result<ServerSocket> {
    let (stream, _) = listener.accept().await?;
    Ok(tokio_tungstenite::accept_async(stream).await?)
}

fn new_session(config: SessionConfig) -> ChatSession {
    let connector: Arc<dyn Connector> = Arc::new(WsConnector::default());
    ChatSession::new(config, connector)
}

/// Join as `username` while the server accepts; returns the server end after the join frame
async fn joined(listener: &TcpListener, session: &mut ChatSession, username: &str) -> Result<(ServerSocket, String)> {
    let (server, outcome) = tokio::join!(
        async {
            let mut ws = accept(listener).await?;
            let first = next_text(&mut ws).await?;
            anyhow::Ok((ws, first))
        },
        session.join(username)
    );
    assert!(matches!(outcome?, JoinOutcome::Joined { .. }));
    server
}

async fn next_text(ws: &mut ServerSocket) -> Result<String> {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), ws.next()).await? {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_string()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => anyhow::bail!("client hung up"),
        }
    }
}

fn write_tone(dir: &Path, samples: usize) -> Result<PathBuf> {
    let path = dir.join("speech.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for i in 0..samples {
        writer.write_sample(((i % 64) as i16 - 32) * 100)?;
    }
    writer.finalize()?;
    Ok(path)
}

#[tokio::test]
async fn test_join_announces_username() -> Result<()> {
    let (listener, config) = listen(AudioSource::Microphone).await?;
    let mut session = new_session(config);

    let (_ws, first) = joined(&listener, &mut session, " alice").await?;

    let value: serde_json::Value = serde_json::from_str(&first)?;
    assert_eq!(value, serde_json::json!({"type": "join", "username": " alice"}));
    assert_eq!(session.username(), Some(" alice"));
    assert_eq!(session.state(), SessionState::Active);
    assert!(session.view().chat_visible());

    Ok(())
}

#[tokio::test]
async fn test_join_fails_when_server_unreachable() -> Result<()> {
    let (listener, config) = listen(AudioSource::Microphone).await?;
    drop(listener);
    let mut session = new_session(config);

    assert!(session.join("alice").await.is_err());
    assert_eq!(session.state(), SessionState::Created);
    assert!(session.view().login_visible());

    Ok(())
}

#[tokio::test]
async fn test_inbound_lines_render_and_bad_json_is_skipped() -> Result<()> {
    let (listener, config) = listen(AudioSource::Microphone).await?;
    let mut session = new_session(config);
    let (mut ws, _) = joined(&listener, &mut session, "alice").await?;

    ws.send(Message::text(r#"{"type":"partial","username":"bob","text":"hel"}"#.to_string()))
        .await?;
    ws.send(Message::text("not json at all".to_string())).await?;
    ws.send(Message::text(r#"{"type":"final","username":"bob","text":"hello"}"#.to_string()))
        .await?;

    for _ in 0..2 {
        let message = tokio::time::timeout(Duration::from_secs(5), session.next_message())
            .await?
            .expect("message");
        session.handle_message(message);
    }

    let lines: Vec<String> = session.view().messages.lines().iter().map(|l| l.to_string()).collect();
    assert_eq!(lines, vec!["bob: hello"]);
    assert_eq!(session.stats().messages_received, 2);

    Ok(())
}

#[tokio::test]
async fn test_recording_a_file_streams_wav_slices() -> Result<()> {
    let temp_dir = TempDir::new()?;
    // 600 ms: two full 250 ms slices plus a 100 ms tail
    let path = write_tone(temp_dir.path(), 26460)?;

    let (listener, config) = listen(AudioSource::File(path)).await?;
    let mut session = new_session(config);
    let (mut ws, _) = joined(&listener, &mut session, "alice").await?;

    assert!(session.toggle_recording().await.is_recording());

    let mut slices = Vec::new();
    while slices.len() < 3 {
        match tokio::time::timeout(Duration::from_secs(5), ws.next()).await? {
            Some(Ok(Message::Binary(bytes))) => slices.push(bytes.to_vec()),
            Some(Ok(_)) => {}
            other => anyhow::bail!("unexpected frame: {:?}", other),
        }
    }

    for slice in &slices {
        let reader = hound::WavReader::new(std::io::Cursor::new(slice.clone()))?;
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 44100);
    }
    assert_eq!(slices[0].len(), 44 + 11025 * 2);
    assert_eq!(slices[2].len(), 44 + 4410 * 2);

    // The file ran out, so recording turns itself off
    let event = tokio::time::timeout(Duration::from_secs(5), session.next_event()).await?;
    assert_eq!(event, Some(SessionEvent::RecordingEnded));
    assert_eq!(session.view().record_label(), START_LABEL);
    assert!(!session.holds_capture_device());

    let stats = session.close().await?;
    assert_eq!(stats.slices_sent, 3);
    assert_eq!(stats.slices_dropped, 0);

    Ok(())
}

#[tokio::test]
async fn test_close_sends_close_frame() -> Result<()> {
    let (listener, config) = listen(AudioSource::Microphone).await?;
    let mut session = new_session(config);
    let (mut ws, _) = joined(&listener, &mut session, "alice").await?;

    let server = tokio::spawn(async move {
        let mut saw_close = false;
        while let Some(Ok(frame)) = ws.next().await {
            if let Message::Close(_) = frame {
                saw_close = true;
            }
        }
        saw_close
    });

    session.close().await?;
    assert_eq!(session.state(), SessionState::Closed);
    assert!(tokio::time::timeout(Duration::from_secs(5), server).await??);

    Ok(())
}

#[tokio::test]
async fn test_server_hang_up_ends_session() -> Result<()> {
    let (listener, config) = listen(AudioSource::Microphone).await?;
    let mut session = new_session(config);
    let (mut ws, _) = joined(&listener, &mut session, "alice").await?;

    ws.close(None).await?;
    drop(ws);

    let next = tokio::time::timeout(Duration::from_secs(5), session.next_message()).await?;
    assert!(next.is_none());
    assert_eq!(session.state(), SessionState::Closed);

    Ok(())
}
