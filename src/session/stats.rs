use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the session joined, if it has
    pub started_at: Option<DateTime<Utc>>,

    /// Time since joining in seconds
    pub duration_secs: f64,

    /// Audio slices written to the connection
    pub slices_sent: u64,

    /// Audio slices dropped because the connection was not open
    pub slices_dropped: u64,

    /// Bytes of audio written to the connection
    pub bytes_sent: u64,

    /// Chat messages received
    pub messages_received: u64,
}

/// Counters updated from the streaming and receiving paths
#[derive(Debug, Default)]
pub struct SessionCounters {
    slices_sent: AtomicU64,
    slices_dropped: AtomicU64,
    bytes_sent: AtomicU64,
    messages_received: AtomicU64,
}

impl SessionCounters {
    pub fn record_sent(&self, bytes: usize) {
        self.slices_sent.fetch_add(1, Ordering::SeqCst);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::SeqCst);
    }

    pub fn record_dropped(&self) {
        self.slices_dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self, is_recording: bool, started_at: Option<DateTime<Utc>>) -> SessionStats {
        let duration_secs = started_at
            .map(|t| Utc::now().signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            is_recording,
            started_at,
            duration_secs,
            slices_sent: self.slices_sent.load(Ordering::SeqCst),
            slices_dropped: self.slices_dropped.load(Ordering::SeqCst),
            bytes_sent: self.bytes_sent.load(Ordering::SeqCst),
            messages_received: self.messages_received.load(Ordering::SeqCst),
        }
    }
}
