//! # Request/Reply Transport
//!
//! Both the announcer and the repeater speak the same simple pattern: send
//! one binary payload, wait for one binary reply. [`RequestChannel`] is that
//! pattern as a trait, and [`TcpChannel`] is the production implementation.
//!
//! ## Framing
//!
//! Each payload is one frame: a 4-byte big-endian length followed by that
//! many bytes. Frames larger than the channel's `max_frame_bytes` are
//! refused in both directions.
//!
//! ## Timeouts and poisoning
//!
//! Every exchange runs under a deadline. When the deadline passes, or any
//! I/O error occurs mid-exchange, the reply may still be in flight and the
//! stream is no longer in a known position. The channel drops the
//! connection and refuses further requests with
//! [`TransportError::Unusable`] until [`TcpChannel::reconnect`] is called.
//! There is no automatic retry.
//!
//! `request` takes `&mut self`, so one channel can never have two
//! requests outstanding.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Errors raised by a [`RequestChannel`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no reply within {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("peer closed the connection")]
    Closed,

    #[error("channel to {endpoint} is unusable after an earlier failure; reconnect first")]
    Unusable { endpoint: String },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A strict request/reply channel.
#[async_trait]
pub trait RequestChannel: Send {
    /// Send `payload` and wait for exactly one reply.
    async fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Human-readable peer name, used in logs and errors.
    fn endpoint(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// Write one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin + Send>(
    io: &mut W,
    payload: &[u8],
    max_frame_bytes: usize,
) -> Result<(), TransportError> {
    if payload.len() > max_frame_bytes || payload.len() > u32::MAX as usize {
        return Err(TransportError::FrameTooLarge {
            len: payload.len(),
            max: max_frame_bytes,
        });
    }
    io.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    io.write_all(payload).await?;
    io.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame. A clean EOF before the length prefix
/// is [`TransportError::Closed`].
pub async fn read_frame<R: AsyncRead + Unpin + Send>(
    io: &mut R,
    max_frame_bytes: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0u8; 4];
    match io.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(TransportError::Closed),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_bytes {
        return Err(TransportError::FrameTooLarge {
            len,
            max: max_frame_bytes,
        });
    }

    let mut frame = vec![0u8; len];
    io.read_exact(&mut frame).await?;
    Ok(frame)
}

// ---------------------------------------------------------------------------
// TcpChannel
// ---------------------------------------------------------------------------

/// A [`RequestChannel`] over a single TCP connection.
#[derive(Debug)]
pub struct TcpChannel {
    endpoint: String,
    stream: Option<TcpStream>,
    timeout: Duration,
    max_frame_bytes: usize,
}

impl TcpChannel {
    /// Connect to `endpoint` (`host:port`). The connect itself is bounded
    /// by `timeout` too.
    pub async fn connect(
        endpoint: &str,
        request_timeout: Duration,
        max_frame_bytes: usize,
    ) -> Result<Self, TransportError> {
        let stream = open(endpoint, request_timeout).await?;
        debug!(endpoint, "connected");
        Ok(Self {
            endpoint: endpoint.to_string(),
            stream: Some(stream),
            timeout: request_timeout,
            max_frame_bytes,
        })
    }

    /// `false` once a timeout or I/O error has poisoned the channel.
    pub fn is_usable(&self) -> bool {
        self.stream.is_some()
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// Drop the current connection (if any) and open a fresh one.
    pub async fn reconnect(&mut self) -> Result<(), TransportError> {
        self.stream = None;
        let stream = open(&self.endpoint, self.timeout).await?;
        self.stream = Some(stream);
        debug!(endpoint = %self.endpoint, "reconnected");
        Ok(())
    }

    fn poison(&mut self, reason: &TransportError) {
        warn!(endpoint = %self.endpoint, error = %reason, "channel poisoned");
        self.stream = None;
    }
}

async fn open(endpoint: &str, limit: Duration) -> Result<TcpStream, TransportError> {
    let stream = match timeout(limit, TcpStream::connect(endpoint)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(TransportError::Timeout {
                after_ms: limit.as_millis() as u64,
            })
        }
    };
    stream.set_nodelay(true)?;
    Ok(stream)
}

#[async_trait]
impl RequestChannel for TcpChannel {
    async fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        if payload.len() > self.max_frame_bytes {
            return Err(TransportError::FrameTooLarge {
                len: payload.len(),
                max: self.max_frame_bytes,
            });
        }

        let max = self.max_frame_bytes;
        let limit = self.timeout;
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Unusable {
                endpoint: self.endpoint.clone(),
            });
        };

        let exchange = async {
            write_frame(stream, payload, max).await?;
            read_frame(stream, max).await
        };

        let outcome = match timeout(limit, exchange).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                after_ms: limit.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(reply) => {
                debug!(
                    endpoint = %self.endpoint,
                    sent = payload.len(),
                    received = reply.len(),
                    "exchange complete"
                );
                Ok(reply)
            }
            Err(err) => {
                self.poison(&err);
                Err(err)
            }
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const MAX: usize = 1024;

    async fn echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    while let Ok(frame) = read_frame(&mut sock, MAX).await {
                        if write_frame(&mut sock, &frame, MAX).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        addr
    }

    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let Ok((sock, _)) = listener.accept().await else {
                    return;
                };
                held.push(sock);
            }
        });
        addr
    }

    #[tokio::test]
    async fn frame_roundtrip_in_memory() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_frame(&mut a, b"hello", MAX).await.unwrap();
        assert_eq!(read_frame(&mut b, MAX).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn empty_frame_is_valid() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_frame(&mut a, b"", MAX).await.unwrap();
        assert!(read_frame(&mut b, MAX).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_incoming_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&(MAX as u32 + 1).to_be_bytes()).await.unwrap();
        assert!(matches!(
            read_frame(&mut b, MAX).await,
            Err(TransportError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn eof_before_length_is_closed() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(matches!(
            read_frame(&mut b, MAX).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn tcp_request_reply() {
        let addr = echo_server().await;
        let mut channel = TcpChannel::connect(&addr, Duration::from_secs(5), MAX)
            .await
            .unwrap();
        assert_eq!(channel.request(b"ping").await.unwrap(), b"ping");
        assert_eq!(channel.request(b"pong").await.unwrap(), b"pong");
        assert!(channel.is_usable());
    }

    #[tokio::test]
    async fn oversized_request_does_not_poison() {
        let addr = echo_server().await;
        let mut channel = TcpChannel::connect(&addr, Duration::from_secs(5), 8)
            .await
            .unwrap();
        assert!(matches!(
            channel.request(&[0u8; 9]).await,
            Err(TransportError::FrameTooLarge { .. })
        ));
        assert!(channel.is_usable());
    }

    #[tokio::test]
    async fn timeout_poisons_until_reconnect() {
        let addr = silent_server().await;
        let mut channel = TcpChannel::connect(&addr, Duration::from_millis(100), MAX)
            .await
            .unwrap();

        let err = channel.request(b"anyone?").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(!channel.is_usable());

        assert!(matches!(
            channel.request(b"again").await,
            Err(TransportError::Unusable { .. })
        ));

        channel.reconnect().await.unwrap();
        assert!(channel.is_usable());
    }

    #[tokio::test]
    async fn connect_refused() {
        // Bind then drop to get a port nobody is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(matches!(
            TcpChannel::connect(&addr, Duration::from_secs(1), MAX).await,
            Err(TransportError::Connect { .. })
        ));
    }
}
