//! Listening socket and accept loop

use super::RelayState;
use crate::connection::Connection;
use crate::session::SessionHandler;
use crate::transport::{tcp, websocket, BoxFrameSink, BoxFrameStream};
use chat_common::{AppConfig, AppError, AppResult, ServerConfig, TransportKind};
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Time allowed for a WebSocket upgrade handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after an accept error that is likely to repeat immediately
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound relay, ready to accept connections
pub struct RelayServer {
    listener: TcpListener,
    state: RelayState,
}

impl RelayServer {
    /// Bind the listening endpoint described by `config`
    ///
    /// # Errors
    /// Returns `AppError::InvalidAddress` if the host is not an IP address
    /// and `AppError::Bind` if the endpoint cannot be acquired. Nothing has
    /// been accepted at that point.
    pub async fn bind(config: AppConfig) -> AppResult<Self> {
        let addr = listen_addr(&config.server)?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::bind(addr, e))?;

        let local = listener.local_addr()?;
        tracing::info!(
            transport = %config.server.transport,
            "Chat relay listening on {}://{}",
            config.server.transport.scheme(),
            local
        );

        Ok(Self {
            listener,
            state: RelayState::new(config),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared state handed to sessions
    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Accept connections forever
    pub async fn run(self) {
        loop {
            self.accept_one().await;
        }
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                () = self.accept_one() => {}
            }
        }

        tracing::info!(
            members = self.state.registry().len(),
            "Accept loop stopped"
        );
    }

    /// Run the accept loop on a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn accept_one(&self) {
        match self.listener.accept().await {
            Ok((stream, peer)) => {
                spawn_session(self.state.clone(), stream, peer);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                if is_resource_exhaustion(&e) {
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("state", &self.state)
            .finish()
    }
}

/// Socket address for the configured host and port
///
/// The host must be an IP literal (brackets around IPv6 are allowed) or
/// `localhost`; no name resolution happens.
fn listen_addr(server: &ServerConfig) -> AppResult<SocketAddr> {
    let host = server.host.trim();
    let ip = if host.eq_ignore_ascii_case("localhost") {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .map_err(|_| AppError::InvalidAddress(server.host.clone()))?
    };

    Ok(SocketAddr::new(ip, server.port))
}

/// Start a session task for an accepted stream
fn spawn_session(state: RelayState, stream: TcpStream, peer: SocketAddr) -> JoinHandle<()> {
    let id = state.next_connection_id();
    tracing::info!(connection_id = %id, peer = %peer, "Connection accepted");

    tokio::spawn(async move {
        let Some((writer, reader)) = open_transport(&state, stream, peer).await else {
            return;
        };

        let connection = Connection::new(id, peer, writer, state.write_timeout());
        let summary = SessionHandler::new(state, connection.clone(), reader)
            .run()
            .await;

        tracing::info!(
            connection_id = %summary.connection_id,
            identity = summary.identity.as_ref().map(|i| i.as_str()),
            messages = summary.messages_relayed,
            duration_ms = connection.age().as_millis() as u64,
            reason = %summary.close_reason,
            "Session ended"
        );
    })
}

/// Wrap an accepted stream in the configured transport
async fn open_transport(
    state: &RelayState,
    stream: TcpStream,
    peer: SocketAddr,
) -> Option<(BoxFrameSink, BoxFrameStream)> {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
    }

    match state.config().server.transport {
        TransportKind::Tcp => {
            let (reader, writer) = tcp::split(stream, state.config().session.max_frame_len);
            Some((Box::new(writer), Box::new(reader)))
        }
        TransportKind::WebSocket => {
            let ws_config = websocket::config(state.config().session.max_frame_len);
            let handshake = tokio_tungstenite::accept_async_with_config(stream, Some(ws_config));

            match tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake).await {
                Ok(Ok(socket)) => {
                    let (reader, writer) = websocket::split(socket);
                    Some((Box::new(writer), Box::new(reader)))
                }
                Ok(Err(e)) => {
                    tracing::warn!(peer = %peer, error = %e, "WebSocket handshake failed");
                    None
                }
                Err(_) => {
                    tracing::warn!(peer = %peer, "WebSocket handshake timed out");
                    None
                }
            }
        }
    }
}

/// Accept errors caused by running out of descriptors or memory
fn is_resource_exhaustion(err: &io::Error) -> bool {
    // EMFILE / ENFILE / ENOMEM / ENOBUFS surface as uncategorized errors.
    matches!(err.raw_os_error(), Some(12 | 23 | 24 | 105)) || err.kind() == io::ErrorKind::OutOfMemory
}
