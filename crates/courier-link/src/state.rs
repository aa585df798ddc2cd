use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle of the physical link.
///
/// Disconnected -> Connecting -> Connected -> Closing -> Disconnected, with
/// Connecting falling straight back to Disconnected when the open fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "Not connected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Closing => "Closing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    pub connected_at: Option<Instant>,
    pub last_frame_at: Option<Instant>,
    pub frames_rx: u64,
    pub decode_errors: u64,
    pub commands_tx: u64,
}

impl LinkStats {
    pub fn last_frame_age(&self) -> Option<Duration> {
        self.last_frame_at.map(|t| t.elapsed())
    }

    pub fn uptime(&self) -> Option<Duration> {
        self.connected_at.map(|t| t.elapsed())
    }
}
