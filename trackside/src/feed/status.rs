//! Connection status types for the feed client.

use std::fmt;

/// Lifecycle state of the feed connection.
///
/// Driven only by the socket opening and closing. Message-level and
/// transport errors never change it on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// A connection attempt is in progress.
    #[default]
    Connecting,
    /// The socket is open and frames are flowing.
    Open,
    /// The socket is closed (teardown, remote close, or failed attempt).
    Closed,
}

impl ConnectionStatus {
    /// Whether frames can currently arrive.
    pub fn is_open(self) -> bool {
        self == ConnectionStatus::Open
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Open => write!(f, "open"),
            ConnectionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Observable status of a feed connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStatus {
    /// Current connection state.
    pub connection: ConnectionStatus,
    /// Last transport error, cleared when a connection opens.
    pub transport_error: Option<String>,
}

impl FeedStatus {
    /// Whether the last transport operation failed.
    pub fn has_error(&self) -> bool {
        self.transport_error.is_some()
    }
}
