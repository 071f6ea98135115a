//! # Socksmith - HTTP client over proxy tunnels
//!
//! Socksmith reaches a destination HTTP server through an intermediary
//! proxy speaking one of several wire protocols (plain HTTP relaying,
//! SOCKS4, SOCKS4a, SOCKS5), optionally upgrades the tunneled connection
//! to TLS, issues an HTTP/1.1 request over the channel and decodes the raw
//! response.
//!
//! ## Features
//!
//! - **Four proxy protocols**: HTTP relay, SOCKS4, SOCKS4a and SOCKS5,
//!   selected at client construction
//! - **TLS tunnels**: `https` destinations are wrapped in rustls after the
//!   handshake, validated against the destination hostname
//! - **Hand-rolled HTTP framing**: responses are delimited by
//!   `Content-Length` or chunked transfer-encoding off the raw stream
//! - **Keep-alive**: sequential requests to the same destination reuse the
//!   negotiated tunnel
//! - **Timings**: connect, first-byte and total durations per request
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksmith::{ProxyClient, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), socksmith::ProxyError> {
//!     let mut client = ProxyClient::socks5("127.0.0.1", 1080)?;
//!     let response = client
//!         .get("http://example.com/", RequestOptions::default())
//!         .await?;
//!     println!("{} ({} ms)", response.status, response.timings.total_ms());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ProxyClient -> TCP connect -> handshake (SOCKS4/4a/5 or none)
//!             -> optional TLS upgrade -> request encoder
//!             -> response decoder -> Response + Timings
//! ```
//!
//! A client instance owns exactly one socket and is meant for strictly
//! sequential use; operations take `&mut self`. The library never retries:
//! retry policy belongs to the caller.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod socks;
pub mod timing;
pub mod transport;

// Re-export commonly used items
pub use client::{ProxyClient, RequestOptions};
pub use config::{Credentials, ProxyEndpoint, TlsOptions};
pub use error::{ProxyError, Socks4Error, Socks5Error};
pub use http::{Method, Response};
pub use timing::Timings;

/// Version of the Socksmith library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the library
pub const NAME: &str = env!("CARGO_PKG_NAME");
