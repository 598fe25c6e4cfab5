//! Transport error types

use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised while moving frames over a transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket-level failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// WebSocket protocol or socket failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// A write did not complete in time
    #[error("Write timed out after {0:?}")]
    Timeout(Duration),

    /// The connection was already closed or marked failed
    #[error("Connection closed")]
    Closed,

    /// A line exceeded the configured frame limit
    #[error("Frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },

    /// A frame was not valid UTF-8
    #[error("Frame is not valid UTF-8")]
    InvalidUtf8,
}

impl TransportError {
    /// Whether this is the peer going away rather than something going wrong
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Closed => true,
            Self::Io(e) => is_disconnect_kind(e.kind()),
            Self::WebSocket(e) => match e {
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => true,
                tungstenite::Error::Protocol(
                    tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
                ) => true,
                tungstenite::Error::Io(io) => is_disconnect_kind(io.kind()),
                _ => false,
            },
            Self::Timeout(_) | Self::FrameTooLarge { .. } | Self::InvalidUtf8 => false,
        }
    }

    /// Whether the peer sent something the relay cannot accept
    pub fn is_protocol_anomaly(&self) -> bool {
        match self {
            Self::FrameTooLarge { .. } | Self::InvalidUtf8 => true,
            Self::WebSocket(e) => {
                !self.is_disconnect()
                    && matches!(
                        e,
                        tungstenite::Error::Protocol(_)
                            | tungstenite::Error::Utf8
                            | tungstenite::Error::Capacity(_)
                    )
            }
            Self::Io(_) | Self::Timeout(_) | Self::Closed => false,
        }
    }
}

fn is_disconnect_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}
