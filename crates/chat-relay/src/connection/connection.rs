//! Individual chat connection
//!
//! Holds the write half of one accepted transport. The read half stays with
//! the session that owns the connection.

use crate::transport::{BoxFrameSink, TransportError};
use chat_core::ConnectionId;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;

/// A single accepted connection
///
/// Shared as `Arc<Connection>` between its session and the registry. Writes
/// from any task are serialized by a per-connection lock and bounded by the
/// write timeout.
pub struct Connection {
    /// Accept-order identifier
    id: ConnectionId,

    /// Remote address
    peer_addr: SocketAddr,

    /// Write half, guarded against concurrent writers
    writer: Mutex<BoxFrameSink>,

    /// Bound on a single write, lock wait included
    write_timeout: Duration,

    /// Cleared once the connection failed a write or was shut down
    alive: AtomicBool,

    /// Wakes the owning session when the connection is marked failed
    close_signal: Notify,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        writer: BoxFrameSink,
        write_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            peer_addr,
            writer: Mutex::new(writer),
            write_timeout,
            alive: AtomicBool::new(true),
            close_signal: Notify::new(),
            created_at: Instant::now(),
        })
    }

    /// Get the connection id
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the remote address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether writes may still be attempted
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Send one frame to the peer
    pub async fn send(&self, frame: &str) -> Result<(), TransportError> {
        if !self.is_alive() {
            return Err(TransportError::Closed);
        }

        let write = async {
            let mut writer = self.writer.lock().await;
            writer.send_frame(frame).await
        };

        timeout(self.write_timeout, write)
            .await
            .map_err(|_| TransportError::Timeout(self.write_timeout))?
    }

    /// Mark the connection failed and wake its session for teardown
    ///
    /// Returns `true` if this call flipped the connection from alive.
    pub fn mark_failed(&self) -> bool {
        let was_alive = self.alive.swap(false, Ordering::SeqCst);
        // notify_one stores a permit, so a session that is not yet waiting
        // still observes the signal.
        self.close_signal.notify_one();
        was_alive
    }

    /// Resolve once the connection has been marked failed
    pub async fn closed(&self) {
        while self.is_alive() {
            self.close_signal.notified().await;
        }
    }

    /// Close the write half; only the owning session calls this
    pub async fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);

        let close = async {
            let mut writer = self.writer.lock().await;
            writer.close().await
        };

        match timeout(self.write_timeout, close).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::trace!(connection_id = %self.id, error = %e, "Error closing transport");
            }
            Err(_) => {
                tracing::debug!(connection_id = %self.id, "Timed out closing transport");
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("alive", &self.is_alive())
            .field("created_at", &self.created_at)
            .finish()
    }
}
