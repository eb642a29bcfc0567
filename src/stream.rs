// Copyright 2024, The rust-ipfs-core Authors
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! A bidirectional byte channel over one connection (§4.1).
//!
//! Generic over its transport (`tokio::net::TcpStream` in production, a
//! `tokio::io::DuplexStream` half in tests), the way the teacher's connection manager is
//! generic over its `Transport::Output`. This is the "insecure stream" the spec assumes; a
//! secure upgrade hook would wrap another `PeerStream` around the negotiated inner transport
//! and swap it into `SessionContext::default_stream`.

use std::{
    io,
    net::{IpAddr, SocketAddr},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
    time,
};

use crate::peer_manager::now_epoch;

pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("read timed out")]
    Timeout,
    #[error("peer closed the connection")]
    Closed,
}

/// Result of a non-consuming readiness check.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PeekStatus {
    /// At least this many bytes are available without blocking.
    Ready(usize),
    /// Nothing available yet.
    Empty,
}

struct Inner<T> {
    stream: T,
    /// One byte of lookahead consumed from `stream` by `peek` but not yet handed to a caller
    /// of `read`/`read_line`. This is what lets `peek` be non-consuming without the kernel's
    /// `MSG_PEEK` (unavailable on a generic `AsyncRead`).
    peeked: Option<u8>,
    eof: bool,
}

impl<T> Inner<T>
where T: AsyncRead + Unpin
{
    async fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.peeked.take() {
            return Ok(Some(b));
        }
        if self.eof {
            return Ok(None);
        }
        let mut buf = [0u8; 1];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            self.eof = true;
            return Ok(None);
        }
        Ok(Some(buf[0]))
    }

    async fn read_exact_buf(&mut self, out: &mut [u8]) -> io::Result<()> {
        if out.is_empty() {
            return Ok(());
        }
        let mut idx = 0;
        if let Some(b) = self.peeked.take() {
            out[0] = b;
            idx = 1;
        }
        if idx < out.len() {
            if self.eof {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
            }
            match self.stream.read_exact(&mut out[idx..]).await {
                Ok(_) => {},
                Err(e) => {
                    if e.kind() == io::ErrorKind::UnexpectedEof {
                        self.eof = true;
                    }
                    return Err(e);
                },
            }
        }
        Ok(())
    }
}

/// A peer-facing duplex byte stream, matching the source's `peek`/`read`/`write`/`close`
/// surface. Every successful read or write bumps `last_comm_epoch`.
pub struct PeerStream<T> {
    inner: Mutex<Inner<T>>,
    remote_addr: Option<SocketAddr>,
    last_comm_epoch: AtomicU64,
}

impl<T> PeerStream<T>
where T: AsyncRead + AsyncWrite + Unpin + Send
{
    pub fn new(inner: T, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                stream: inner,
                peeked: None,
                eof: false,
            }),
            remote_addr,
            last_comm_epoch: AtomicU64::new(now_epoch()),
        }
    }

    pub fn remote_ip(&self) -> Option<IpAddr> {
        self.remote_addr.map(|a| a.ip())
    }

    pub fn remote_port(&self) -> Option<u16> {
        self.remote_addr.map(|a| a.port())
    }

    pub fn last_comm_epoch(&self) -> u64 {
        self.last_comm_epoch.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.last_comm_epoch.store(now_epoch(), Ordering::Relaxed);
    }

    /// Reports whether a subsequent `read` would make progress, without consuming bytes from
    /// the caller's point of view (internally it may pull one byte into a one-byte lookahead
    /// buffer, which `read`/`read_line` transparently replay). EOF is reported as `Ready(0)`
    /// so callers can tell "peer went away" from "nothing sent yet" apart on the next `read`.
    pub async fn peek(&self) -> Result<PeekStatus, StreamError> {
        let mut guard = self.inner.lock().await;
        if guard.eof {
            return Ok(PeekStatus::Ready(0));
        }
        if guard.peeked.is_some() {
            return Ok(PeekStatus::Ready(1));
        }
        let mut buf = [0u8; 1];
        match time::timeout(Duration::from_millis(50), guard.stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                guard.eof = true;
                Ok(PeekStatus::Ready(0))
            },
            Ok(Ok(_)) => {
                guard.peeked = Some(buf[0]);
                Ok(PeekStatus::Ready(1))
            },
            Ok(Err(e)) => Err(StreamError::Io(e)),
            Err(_) => Ok(PeekStatus::Empty),
        }
    }

    /// Reads one length-prefixed frame, bounded by `timeout`. The length prefix is a
    /// big-endian u32 byte count, the framing used for protocol message bodies after
    /// negotiation.
    pub async fn read(&self, timeout: Duration) -> Result<Vec<u8>, StreamError> {
        let mut guard = self.inner.lock().await;
        let fut = async {
            let mut len_buf = [0u8; 4];
            guard.read_exact_buf(&mut len_buf).await?;
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut body = vec![0u8; len];
            guard.read_exact_buf(&mut body).await?;
            Ok::<_, io::Error>(body)
        };
        match time::timeout(timeout, fut).await {
            Ok(Ok(body)) => {
                drop(guard);
                self.touch();
                Ok(body)
            },
            Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Err(StreamError::Closed),
            Ok(Err(e)) => Err(StreamError::Io(e)),
            Err(_) => Err(StreamError::Timeout),
        }
    }

    /// Reads a raw `\n`-terminated announce line without a length prefix, used only during
    /// multistream negotiation (§4.2). Bounded by `timeout`.
    pub async fn read_line(&self, timeout: Duration) -> Result<Vec<u8>, StreamError> {
        let mut guard = self.inner.lock().await;
        let fut = async {
            let mut line = Vec::new();
            loop {
                match guard.read_byte().await? {
                    Some(b) => {
                        line.push(b);
                        if b == b'\n' {
                            break;
                        }
                    },
                    None => return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof before newline")),
                }
            }
            Ok::<_, io::Error>(line)
        };
        match time::timeout(timeout, fut).await {
            Ok(Ok(line)) => {
                drop(guard);
                self.touch();
                Ok(line)
            },
            Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Err(StreamError::Closed),
            Ok(Err(e)) => Err(StreamError::Io(e)),
            Err(_) => Err(StreamError::Timeout),
        }
    }

    /// Writes `bytes` as a single length-prefixed frame, atomically with respect to other
    /// writers (the write-half is held for the whole frame).
    pub async fn write_framed(&self, bytes: &[u8]) -> Result<usize, StreamError> {
        let mut guard = self.inner.lock().await;
        let len = u32::try_from(bytes.len())
            .map_err(|_| StreamError::Io(io::Error::new(io::ErrorKind::InvalidInput, "frame too large")))?;
        guard.stream.write_all(&len.to_be_bytes()).await?;
        guard.stream.write_all(bytes).await?;
        guard.stream.flush().await?;
        drop(guard);
        self.touch();
        Ok(bytes.len())
    }

    /// Writes `bytes` verbatim with no length prefix: used for `\n`-terminated multistream
    /// announce lines, which the negotiator reads back with [`Self::read_line`] rather than
    /// [`Self::read`].
    pub async fn write_raw(&self, bytes: &[u8]) -> Result<usize, StreamError> {
        let mut guard = self.inner.lock().await;
        guard.stream.write_all(bytes).await?;
        guard.stream.flush().await?;
        drop(guard);
        self.touch();
        Ok(bytes.len())
    }

    pub async fn close(&self) {
        let mut guard = self.inner.lock().await;
        let _ = guard.stream.shutdown().await;
    }
}
