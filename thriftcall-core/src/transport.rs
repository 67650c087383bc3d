//! # Transport
//!
//! The session hands the transport one fully encoded message at a time and receives one reply
//! frame back. Socket setup, buffering and connection lifecycle live behind [`Transport`].
//!
//! [`FramedTransport`] implements the framed layout: a 4-byte big-endian length followed by
//! the message bytes, over any tokio byte stream.
use bytes::{BufMut, Bytes, BytesMut};
use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Frames larger than this are refused unless configured otherwise.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Moves whole messages between the session and the peer.
pub trait Transport {
    /// Sends one message and flushes it.
    fn send(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Receives the next message.
    fn recv(&mut self) -> impl Future<Output = io::Result<Bytes>> + Send;
}

#[derive(Debug)]
pub struct FramedTransport<S> {
    stream: S,
    max_frame_size: usize,
}

impl<S> FramedTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = max_frame_size;
    }

    fn check_size(&self, len: usize) -> io::Result<()> {
        if len > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame of {len} bytes exceeds the maximum of {} bytes",
                    self.max_frame_size
                ),
            ));
        }
        Ok(())
    }
}

impl FramedTransport<TcpStream> {
    /// Opens a TCP connection to `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl<S> Transport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        self.check_size(frame.len())?;
        let len = u32::try_from(frame.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut buf = BytesMut::with_capacity(4 + frame.len());
        buf.put_u32(len);
        buf.put_slice(&frame);

        self.stream.write_all(&buf).await?;
        self.stream.flush().await
    }

    async fn recv(&mut self) -> io::Result<Bytes> {
        let len = self.stream.read_u32().await? as usize;
        self.check_size(len)?;

        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}
