//! Session error types

use crate::connection::RegistryError;
use crate::transport::TransportError;
use thiserror::Error;

/// Errors that end a session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading from or writing to the session's own transport failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The registry refused the connection
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Broad classification of what went wrong, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The peer went away (reset, broken pipe, closed socket)
    Disconnect,
    /// Socket or write failure that is not a plain disconnect
    TransportFault,
    /// The peer sent something the relay cannot accept
    ProtocolAnomaly,
    /// Internal invariant violated
    Internal,
}

impl SessionError {
    /// Classify this error
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Transport(e) if e.is_disconnect() => FaultKind::Disconnect,
            Self::Transport(e) if e.is_protocol_anomaly() => FaultKind::ProtocolAnomaly,
            Self::Transport(_) => FaultKind::TransportFault,
            Self::Registry(_) => FaultKind::Internal,
        }
    }

    /// Whether this is an ordinary disconnect rather than an anomaly
    pub fn is_expected(&self) -> bool {
        self.kind() == FaultKind::Disconnect
    }
}
