//! Transport layer
//!
//! TCP connection establishment to the proxy endpoint, socket tuning, the
//! TLS tunnel upgrade and a unified stream type so the HTTP framing layer
//! never cares whether it is talking through TLS.

mod tls;

pub use tls::TlsUpgrader;

use crate::config::ProxyEndpoint;
use crate::error::ProxyError;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// TLS stream type alias
pub type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Socket options applied to new proxy connections
#[derive(Debug, Clone)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive timeout
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive_secs: Some(20),
            keepalive_interval: Some(8),
        }
    }
}

impl SocketOpts {
    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

/// Open a TCP connection to the proxy endpoint.
///
/// Host resolution happens here (the endpoint may be a hostname); the
/// timeout bounds resolution plus connect.
pub async fn connect_proxy(
    endpoint: &ProxyEndpoint,
    opts: &SocketOpts,
    connect_timeout: Duration,
) -> Result<TcpStream, ProxyError> {
    let authority = endpoint.authority();

    let stream = tokio::time::timeout(
        connect_timeout,
        TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
    )
    .await
    .map_err(|_| ProxyError::Connection(format!("connection timeout to proxy {}", authority)))?
    .map_err(|e| ProxyError::Connection(format!("failed to connect to proxy {}: {}", authority, e)))?;

    if let Err(e) = opts.apply(&stream) {
        tracing::warn!("Failed to apply socket options: {}", e);
    }

    tracing::debug!(proxy = %authority, "TCP connection established to proxy");
    Ok(stream)
}

/// A proxy tunnel stream, either plain TCP or TLS-wrapped.
///
/// After a TLS upgrade all sends and receives go through the TLS stream;
/// the raw socket is never used directly again.
#[derive(Debug)]
pub enum MaybeTlsStream {
    /// Plain TCP stream
    Plain(TcpStream),
    /// TLS-wrapped stream
    Tls(Box<TlsStream>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
