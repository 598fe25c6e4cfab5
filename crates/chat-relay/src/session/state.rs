//! Session lifecycle states and outcomes

use super::error::{FaultKind, SessionError};
use crate::connection::RegistryError;
use crate::transport::TransportError;
use chat_core::{ConnectionId, Identity};
use std::fmt;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Just accepted; the welcome has not been sent yet
    Connected,
    /// Waiting for the peer to send its identity
    AwaitingIdentity,
    /// Joined; relaying messages
    Active,
    /// Leaving the registry and announcing the departure
    Closing,
    /// Transport released
    Closed,
}

impl SessionState {
    /// Whether the session has finished
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "CONNECTED",
            Self::AwaitingIdentity => "AWAITING_IDENTITY",
            Self::Active => "ACTIVE",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Why a session moved to `Closing`
#[derive(Debug)]
pub enum CloseReason {
    /// The peer sent the exit keyword
    ExitCommand,
    /// The peer closed the transport
    PeerClosed,
    /// A broadcast could not reach this connection
    DeliveryFailed,
    /// No frame arrived within the idle timeout
    IdleTimeout,
    /// Transport or registry failure
    Error(SessionError),
}

impl CloseReason {
    /// Whether the session ended the way sessions normally end
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ExitCommand | Self::PeerClosed | Self::IdleTimeout => true,
            Self::DeliveryFailed => false,
            Self::Error(e) => e.is_expected(),
        }
    }

    /// Fault classification, if the close was caused by a fault
    pub fn fault(&self) -> Option<FaultKind> {
        match self {
            Self::ExitCommand | Self::PeerClosed | Self::IdleTimeout => None,
            Self::DeliveryFailed => Some(FaultKind::TransportFault),
            Self::Error(e) => Some(e.kind()),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCommand => f.write_str("exit command"),
            Self::PeerClosed => f.write_str("peer closed"),
            Self::DeliveryFailed => f.write_str("delivery failed"),
            Self::IdleTimeout => f.write_str("idle timeout"),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

impl From<SessionError> for CloseReason {
    fn from(err: SessionError) -> Self {
        Self::Error(err)
    }
}

impl From<TransportError> for CloseReason {
    fn from(err: TransportError) -> Self {
        Self::Error(err.into())
    }
}

impl From<RegistryError> for CloseReason {
    fn from(err: RegistryError) -> Self {
        Self::Error(err.into())
    }
}

/// What a finished session reports back to the server
#[derive(Debug)]
pub struct SessionSummary {
    pub connection_id: ConnectionId,
    /// Identity, if the handshake completed
    pub identity: Option<Identity>,
    /// Chat lines relayed to other members
    pub messages_relayed: u64,
    pub close_reason: CloseReason,
}
