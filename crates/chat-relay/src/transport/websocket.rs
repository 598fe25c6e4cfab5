//! Message-framed transport over WebSocket
//!
//! Each text message is one frame. Binary messages holding valid UTF-8 are
//! accepted as text; ping/pong traffic is handled by tungstenite and skipped.

use super::{FrameSink, FrameStream, TransportError};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

/// Socket settings capping inbound messages at `max_frame_len` bytes
pub fn config(max_frame_len: usize) -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(max_frame_len);
    config.max_frame_size = Some(max_frame_len);
    config
}

/// Split an upgraded WebSocket into frame halves
pub fn split<S>(socket: WebSocketStream<S>) -> (WsReader<S>, WsWriter<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sink, stream) = socket.split();
    (WsReader { inner: stream }, WsWriter { inner: sink })
}

/// Read half of a WebSocket
pub struct WsReader<S> {
    inner: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameStream for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let Some(message) = self.inner.next().await else {
                return Ok(None);
            };

            match message {
                Ok(Message::Text(text)) => return Ok(Some(text)),
                Ok(Message::Binary(bytes)) => {
                    return String::from_utf8(bytes)
                        .map(Some)
                        .map_err(|_| TransportError::InvalidUtf8);
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                    tracing::trace!("Skipping control frame");
                }
                Ok(Message::Close(_)) => return Ok(None),
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Write half of a WebSocket
pub struct WsWriter<S> {
    inner: SplitSink<WebSocketStream<S>, Message>,
}

#[async_trait]
impl<S> FrameSink for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: &str) -> Result<(), TransportError> {
        self.inner.send(Message::Text(frame.to_owned())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.inner.close().await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
