//! Proxy client orchestration
//!
//! Owns the socket lifecycle: connect to the proxy, run the protocol
//! handshake, optionally upgrade to TLS, write the request, decode the
//! response. One client instance owns exactly one socket; keep-alive reuse
//! is strictly sequential and all operations take `&mut self`.

use crate::config::{Credentials, ProxyEndpoint, TlsOptions};
use crate::error::ProxyError;
use crate::http::{decoder, parse_destination, Method, Request, Response};
use crate::socks::{socks4, socks5, TargetAddr};
use crate::timing::{self, Timings};
use crate::transport::{self, MaybeTlsStream, SocketOpts, TlsUpgrader};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Default timeout for the TCP connect to the proxy
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Proxy wire protocol, a closed set of tunnel strategies.
///
/// SOCKS4a is SOCKS4 with remote DNS, a parameter rather than a separate
/// variant.
#[derive(Debug, Clone)]
enum TunnelKind {
    /// Plain HTTP relaying: absolute-URI requests, no handshake
    Http,
    /// SOCKS4 (binary address) or SOCKS4a (`remote_dns`)
    Socks4 {
        user_id: Option<String>,
        remote_dns: bool,
    },
    /// SOCKS5 with optional username/password authentication
    Socks5 { credentials: Option<Credentials> },
}

/// Destination a live tunnel was negotiated for
#[derive(Debug, Clone, PartialEq, Eq)]
struct Destination {
    host: String,
    port: u16,
    tls: bool,
}

/// A live tunnel through the proxy
#[derive(Debug)]
struct Connection {
    stream: MaybeTlsStream,
    destination: Destination,
}

/// Per-request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Additional request headers, sent in order
    pub headers: Vec<(String, String)>,
    /// Cookies, joined into a single `Cookie` header
    pub cookies: Vec<(String, String)>,
    /// Keep the tunnel open for the next request to the same destination
    pub keep_alive: bool,
    /// Overall time budget for the request (connect through full response)
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            headers: Vec::new(),
            cookies: Vec::new(),
            keep_alive: true,
            timeout: None,
        }
    }
}

/// HTTP client that tunnels every request through a proxy.
///
/// A client owns at most one socket. Dropping the client (or calling
/// [`close`](ProxyClient::close)) closes the socket; closing twice is a
/// no-op.
#[derive(Debug)]
pub struct ProxyClient {
    proxy: ProxyEndpoint,
    kind: TunnelKind,
    tls_options: TlsOptions,
    socket_opts: SocketOpts,
    connect_timeout: Duration,
    connection: Option<Connection>,
}

impl ProxyClient {
    fn new(proxy: ProxyEndpoint, kind: TunnelKind) -> Self {
        ProxyClient {
            proxy,
            kind,
            tls_options: TlsOptions::default(),
            socket_opts: SocketOpts::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connection: None,
        }
    }

    /// Client for a plain HTTP relaying proxy
    pub fn http(host: impl Into<String>, port: u16) -> Result<Self, ProxyError> {
        Ok(Self::new(ProxyEndpoint::new(host, port)?, TunnelKind::Http))
    }

    /// Client for a SOCKS4 proxy (destination resolved client-side)
    pub fn socks4(
        host: impl Into<String>,
        port: u16,
        user_id: Option<String>,
    ) -> Result<Self, ProxyError> {
        Ok(Self::new(
            ProxyEndpoint::new(host, port)?,
            TunnelKind::Socks4 {
                user_id,
                remote_dns: false,
            },
        ))
    }

    /// Client for a SOCKS4a proxy (domain names resolved by the proxy)
    pub fn socks4a(
        host: impl Into<String>,
        port: u16,
        user_id: Option<String>,
    ) -> Result<Self, ProxyError> {
        Ok(Self::new(
            ProxyEndpoint::new(host, port)?,
            TunnelKind::Socks4 {
                user_id,
                remote_dns: true,
            },
        ))
    }

    /// Client for a SOCKS5 proxy without authentication
    pub fn socks5(host: impl Into<String>, port: u16) -> Result<Self, ProxyError> {
        Ok(Self::new(
            ProxyEndpoint::new(host, port)?,
            TunnelKind::Socks5 { credentials: None },
        ))
    }

    /// Client for a SOCKS5 proxy with username/password authentication.
    ///
    /// For open proxies that still demand the subnegotiation, pass empty
    /// strings for both.
    pub fn socks5_with_auth(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ProxyError> {
        let credentials = Credentials::new(username, password)?;
        Ok(Self::new(
            ProxyEndpoint::new(host, port)?,
            TunnelKind::Socks5 {
                credentials: Some(credentials),
            },
        ))
    }

    /// Set TLS options for `https` destinations
    pub fn with_tls_options(mut self, options: TlsOptions) -> Self {
        self.tls_options = options;
        self
    }

    /// Set socket options applied to new proxy connections
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Set the TCP connect timeout for reaching the proxy
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Issue a GET request through the proxy
    pub async fn get(
        &mut self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response, ProxyError> {
        self.execute(Method::Get, url, None, options).await
    }

    /// Issue a POST request with a body through the proxy
    pub async fn post(
        &mut self,
        url: &str,
        body: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Response, ProxyError> {
        self.execute(Method::Post, url, Some(body.into()), options).await
    }

    /// Issue a PUT request with a body through the proxy
    pub async fn put(
        &mut self,
        url: &str,
        body: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Response, ProxyError> {
        self.execute(Method::Put, url, Some(body.into()), options).await
    }

    /// Issue a DELETE request through the proxy
    pub async fn delete(
        &mut self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response, ProxyError> {
        self.execute(Method::Delete, url, None, options).await
    }

    /// Whether a keep-alive tunnel is currently open
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Close the tunnel if one is open. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.connection = None;
    }

    /// Run one request end to end, wrapping failures with proxy and
    /// destination context and tearing the tunnel down on any error
    async fn execute(
        &mut self,
        method: Method,
        url: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<Response, ProxyError> {
        // Validation failures surface before any socket is opened
        let url = parse_destination(url)?;
        let destination = Destination {
            host: url.host_str().unwrap_or_default().to_string(),
            port: url.port_or_known_default().unwrap_or(80),
            tls: url.scheme() == "https",
        };

        let result = match options.timeout {
            Some(limit) => {
                match tokio::time::timeout(
                    limit,
                    self.execute_inner(method, &url, &destination, body, &options),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProxyError::Timeout(format!(
                        "request to {}:{} exceeded {:?}",
                        destination.host, destination.port, limit
                    ))),
                }
            }
            None => {
                self.execute_inner(method, &url, &destination, body, &options)
                    .await
            }
        };

        match result {
            Ok(response) => Ok(response),
            Err(err) => {
                // Faulted: never reuse a possibly-corrupted stream
                self.connection = None;
                Err(err.in_context(
                    &self.proxy.authority(),
                    &format!("{}:{}", destination.host, destination.port),
                ))
            }
        }
    }

    async fn execute_inner(
        &mut self,
        method: Method,
        url: &Url,
        destination: &Destination,
        body: Option<String>,
        options: &RequestOptions,
    ) -> Result<Response, ProxyError> {
        let reuse = options.keep_alive
            && self
                .connection
                .as_ref()
                .map_or(false, |c| c.destination == *destination);

        let connect = if reuse {
            tracing::debug!(
                destination = %destination.host,
                "reusing keep-alive tunnel"
            );
            Duration::ZERO
        } else {
            self.connection = None;
            let (result, elapsed) = timing::timed(self.open_tunnel(destination)).await;
            result?;
            elapsed
        };

        let mut request = Request::new(method, url.clone());
        request.body = body;
        request.headers = options.headers.clone();
        request.cookies = options.cookies.clone();
        request.keep_alive = options.keep_alive;

        let absolute_form = matches!(self.kind, TunnelKind::Http);
        let wire = request.encode(absolute_form);

        let connection = self
            .connection
            .as_mut()
            .expect("tunnel open after connect phase");
        let started = Instant::now();
        connection.stream.write_all(&wire).await?;
        connection.stream.flush().await?;

        let decoded = decoder::read_response(&mut connection.stream, started).await?;
        let total = started.elapsed();

        if !options.keep_alive {
            self.connection = None;
        }

        Ok(Response {
            status: decoded.status,
            headers: decoded.headers,
            cookies: decoded.cookies,
            body: decoded.body,
            timings: Timings {
                connect,
                first_byte: decoded.first_byte,
                total,
            },
        })
    }

    /// Open the TCP connection, run the protocol handshake and perform the
    /// optional TLS upgrade. On error the partially-established socket is
    /// dropped (closed) before the error propagates.
    async fn open_tunnel(&mut self, destination: &Destination) -> Result<(), ProxyError> {
        let mut stream =
            transport::connect_proxy(&self.proxy, &self.socket_opts, self.connect_timeout).await?;

        let target = TargetAddr::from_host_port(&destination.host, destination.port)?;
        match &self.kind {
            TunnelKind::Http => {
                // No handshake: the relay forwards absolute-URI requests
            }
            TunnelKind::Socks4 {
                user_id,
                remote_dns,
            } => {
                socks4::handshake(&mut stream, &target, user_id.as_deref(), *remote_dns).await?;
            }
            TunnelKind::Socks5 { credentials } => {
                socks5::handshake(&mut stream, &target, credentials.as_ref()).await?;
            }
        }

        let stream = if destination.tls {
            let upgrader = TlsUpgrader::new(&self.tls_options)?;
            let hostname = destination.host.trim_start_matches('[').trim_end_matches(']');
            MaybeTlsStream::Tls(Box::new(upgrader.upgrade(stream, hostname).await?))
        } else {
            MaybeTlsStream::Plain(stream)
        };

        self.connection = Some(Connection {
            stream,
            destination: destination.clone(),
        });
        Ok(())
    }
}
