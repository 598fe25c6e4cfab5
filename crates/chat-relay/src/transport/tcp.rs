//! Line-framed transport for raw TCP sockets
//!
//! One frame is one UTF-8 line. Inbound lines may end in `\n` or `\r\n`; a
//! final line without a terminator is still delivered before end of stream.
//! Outbound frames are written with a trailing `\n`.

use super::{FrameSink, FrameStream, TransportError};
use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Split a TCP stream into line-framed halves
pub fn split(
    stream: TcpStream,
    max_frame_len: usize,
) -> (LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>) {
    let (read, write) = stream.into_split();
    (LineReader::new(read, max_frame_len), LineWriter::new(write))
}

/// Reads newline-delimited frames
pub struct LineReader<R> {
    inner: BufReader<R>,
    max_frame_len: usize,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wrap a reader, rejecting lines longer than `max_frame_len` bytes
    pub fn new(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            max_frame_len,
            buf: Vec::new(),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameStream for LineReader<R> {
    async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        self.buf.clear();

        // Leave room for a "\r\n" terminator after a maximal line.
        let limit = (self.max_frame_len as u64).saturating_add(2);
        let read = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await?;

        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        } else if read as u64 == limit {
            return Err(TransportError::FrameTooLarge {
                max: self.max_frame_len,
            });
        }

        if self.buf.len() > self.max_frame_len {
            return Err(TransportError::FrameTooLarge {
                max: self.max_frame_len,
            });
        }

        String::from_utf8(std::mem::take(&mut self.buf))
            .map(Some)
            .map_err(|_| TransportError::InvalidUtf8)
    }
}

/// Writes newline-terminated frames
pub struct LineWriter<W> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for LineWriter<W> {
    async fn send_frame(&mut self, frame: &str) -> Result<(), TransportError> {
        self.buf.clear();
        self.buf.extend_from_slice(frame.as_bytes());
        self.buf.push(b'\n');

        self.inner.write_all(&self.buf).await?;
        self.inner.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
