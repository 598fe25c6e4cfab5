//! Test helpers for integration tests
//!
//! Provides a relay server on an ephemeral port and a minimal chat client
//! for each transport.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chat_common::{AppConfig, TransportKind};
use chat_relay::transport::{tcp, websocket, BoxFrameSink, BoxFrameStream};
use chat_relay::{RelayServer, RelayState};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::fixtures::{test_config, JOINED, WELCOME};

/// How long a client waits for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// How long a client listens to confirm nothing else arrives
pub const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub transport: TransportKind,
    state: RelayState,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a relay on an ephemeral port
    pub async fn start(transport: TransportKind) -> Result<Self> {
        Self::start_with_config(test_config(transport)).await
    }

    /// Start a relay with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let transport = config.server.transport;
        let server = RelayServer::bind(config).await?;
        let addr = server.local_addr()?;
        let state = server.state().clone();
        let handle = server.spawn();

        Ok(Self {
            addr,
            transport,
            state,
            handle,
        })
    }

    /// Shared relay state, for inspecting the registry
    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Open a client without performing the handshake
    pub async fn connect(&self) -> Result<TestClient> {
        TestClient::connect(self.transport, self.addr).await
    }

    /// Open a client and join under `name`
    pub async fn join(&self, name: &str) -> Result<TestClient> {
        let mut client = self.connect().await?;
        client.handshake(name).await?;
        Ok(client)
    }

    /// Join under `name` against a relay stamping its lines
    pub async fn join_timestamped(&self, name: &str) -> Result<TestClient> {
        let mut client = self.connect().await?;
        client.expect(WELCOME).await?;
        client.send(name).await?;

        let confirmation = client.recv().await?;
        let prefix = format!("Welcome, {name}! You joined the chat at ");
        if !confirmation.starts_with(&prefix) || !confirmation.ends_with('.') {
            bail!("unexpected confirmation {confirmation:?}");
        }
        Ok(client)
    }

    /// Identities currently registered, in join order
    pub fn members(&self) -> Vec<String> {
        self.state
            .registry()
            .identities()
            .into_iter()
            .map(|i| i.into_inner())
            .collect()
    }

    /// Wait until the registry holds exactly `expected`
    pub async fn wait_for_members(&self, expected: &[&str]) -> Result<()> {
        wait_until(|| async { self.members() == expected })
            .await
            .with_context(|| format!("registry is {:?}, expected {expected:?}", self.members()))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A chat client speaking the server's transport
pub struct TestClient {
    reader: BoxFrameStream,
    writer: BoxFrameSink,
}

impl TestClient {
    /// Connect to a relay
    pub async fn connect(transport: TransportKind, addr: SocketAddr) -> Result<Self> {
        let (reader, writer): (BoxFrameStream, BoxFrameSink) = match transport {
            TransportKind::Tcp => {
                let stream = TcpStream::connect(addr).await?;
                let (reader, writer) = tcp::split(stream, 64 * 1024);
                (Box::new(reader), Box::new(writer))
            }
            TransportKind::WebSocket => {
                let (socket, _response) =
                    tokio_tungstenite::connect_async(format!("ws://{addr}")).await?;
                let (reader, writer) = websocket::split(socket);
                (Box::new(reader), Box::new(writer))
            }
        };

        Ok(Self { reader, writer })
    }

    /// Read the welcome, send the identity, read the confirmation
    pub async fn handshake(&mut self, name: &str) -> Result<()> {
        self.expect(WELCOME).await?;
        self.send(name).await?;
        self.expect(JOINED).await
    }

    /// Send one frame
    pub async fn send(&mut self, frame: &str) -> Result<()> {
        self.writer.send_frame(frame).await?;
        Ok(())
    }

    /// Receive the next frame
    pub async fn recv(&mut self) -> Result<String> {
        match timeout(RECV_TIMEOUT, self.reader.next_frame()).await {
            Ok(Ok(Some(frame))) => Ok(frame),
            Ok(Ok(None)) => bail!("server closed the connection"),
            Ok(Err(e)) => Err(anyhow!(e)),
            Err(_) => bail!("no frame within {RECV_TIMEOUT:?}"),
        }
    }

    /// Receive the next frame and check it
    pub async fn expect(&mut self, expected: &str) -> Result<()> {
        let frame = self.recv().await?;
        if frame != expected {
            bail!("expected {expected:?}, got {frame:?}");
        }
        Ok(())
    }

    /// Check that nothing arrives for a short while
    pub async fn expect_silence(&mut self) -> Result<()> {
        match timeout(SILENCE_WINDOW, self.reader.next_frame()).await {
            Err(_) => Ok(()),
            Ok(Ok(Some(frame))) => bail!("expected silence, got {frame:?}"),
            Ok(Ok(None)) => bail!("expected silence, server closed the connection"),
            Ok(Err(e)) => Err(anyhow!(e)),
        }
    }

    /// Wait for the server to close the connection
    pub async fn expect_closed(&mut self) -> Result<()> {
        loop {
            match timeout(RECV_TIMEOUT, self.reader.next_frame()).await {
                Ok(Ok(None) | Err(_)) => return Ok(()),
                Ok(Ok(Some(_))) => {}
                Err(_) => bail!("connection still open after {RECV_TIMEOUT:?}"),
            }
        }
    }

    /// Close the write half politely
    pub async fn close(mut self) -> Result<()> {
        self.writer.close().await?;
        Ok(())
    }
}

/// Poll `check` until it holds or a few seconds pass
pub async fn wait_until<F, Fut>(mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("condition not met within {RECV_TIMEOUT:?}")
}
