//! Transports
//!
//! A transport turns a socket into a write half ([`FrameSink`]) and a read half
//! ([`FrameStream`]) that move whole text frames. Everything above this module
//! is transport-agnostic.

mod error;
pub mod tcp;
pub mod websocket;

pub use error::TransportError;

use async_trait::async_trait;

/// Write half of a transport
#[async_trait]
pub trait FrameSink: Send {
    /// Write one frame
    async fn send_frame(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Flush and close the write half
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a transport
#[async_trait]
pub trait FrameStream: Send {
    /// Read the next frame
    ///
    /// Returns `Ok(None)` once the peer has closed the transport.
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError>;
}

/// Boxed write half, as stored in a connection
pub type BoxFrameSink = Box<dyn FrameSink>;

/// Boxed read half, as owned by a session
pub type BoxFrameStream = Box<dyn FrameStream>;
