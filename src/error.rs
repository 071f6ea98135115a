//! Error types for Socksmith
//!
//! This module defines all custom error types used throughout the library.

use crate::socks::consts::{
    SOCKS4_REPLY_GRANTED, SOCKS4_REPLY_IDENTD_MISMATCH, SOCKS4_REPLY_IDENTD_UNREACHABLE,
    SOCKS4_REPLY_REJECTED,
};
use std::io;
use thiserror::Error;

/// Main error type for Socksmith operations
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// DNS resolution error
    #[error("DNS error: {0}")]
    Dns(String),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(String),

    /// SOCKS4 protocol error
    #[error("SOCKS4 error: {0}")]
    Socks4(#[from] Socks4Error),

    /// SOCKS5 protocol error
    #[error("SOCKS5 error: {0}")]
    Socks5(#[from] Socks5Error),

    /// HTTP framing error
    #[error("Framing error: {0}")]
    Framing(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Request failure with proxy and destination context
    #[error("Request via proxy {proxy} to {destination} failed: {source}")]
    Request {
        /// Proxy endpoint the request went through
        proxy: String,
        /// Destination host:port the request targeted
        destination: String,
        /// Underlying cause
        #[source]
        source: Box<ProxyError>,
    },
}

impl ProxyError {
    /// Wrap an error with proxy and destination context.
    ///
    /// Timeout and configuration errors pass through unchanged so callers
    /// can match on them directly.
    pub fn in_context(self, proxy: &str, destination: &str) -> Self {
        match self {
            ProxyError::Timeout(_) | ProxyError::Config(_) | ProxyError::Request { .. } => self,
            other => ProxyError::Request {
                proxy: proxy.to_string(),
                destination: destination.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// SOCKS4/4a specific errors
#[derive(Error, Debug)]
pub enum Socks4Error {
    /// Request rejected or failed (reply code 91)
    #[error("Request rejected or failed")]
    Rejected,

    /// Client is not running identd (reply code 92)
    #[error("Request rejected: cannot connect to identd on the client")]
    IdentdUnreachable,

    /// Identd could not confirm the user-id (reply code 93)
    #[error("Request rejected: identd reports a different user-id")]
    IdentdMismatch,

    /// Unknown reply code
    #[error("Unknown reply code: {0}")]
    UnknownReply(u8),

    /// No IPv4 address available for the destination
    #[error("No IPv4 address for destination: {0}")]
    NoIpv4Address(String),

    /// User-id contains a NUL byte
    #[error("Invalid user-id: {0}")]
    InvalidUserId(String),
}

/// SOCKS5 specific errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Server requires credentials but none were configured
    #[error(
        "Proxy requires username/password authentication but no credentials were \
         configured; supply empty credentials for open proxies"
    )]
    AuthRequired,

    /// Server selected a method the client never offered
    #[error("Server selected unsupported authentication method: {0:#04x}")]
    UnsupportedMethod(u8),

    /// Authentication failed
    #[error("Authentication failed")]
    AuthFailed,

    /// CONNECT rejected by the server
    #[error("{} (raw reply: {reply})", .code.description())]
    Connect {
        /// Reply code returned by the server
        code: Socks5ReplyCode,
        /// Hex dump of the raw reply bytes
        reply: String,
    },

    /// CONNECT reply carried a code outside the defined space
    #[error("Unknown reply code {code:#04x} (raw reply: {reply})")]
    UnknownReply {
        /// Raw reply code byte
        code: u8,
        /// Hex dump of the raw reply bytes
        reply: String,
    },

    /// Reply carried an address type the client cannot consume
    #[error("Address type not supported: {0:#04x}")]
    AddressTypeNotSupported(u8),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),
}

/// Reply codes for the SOCKS4 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks4ReplyCode {
    /// Request granted
    Granted = SOCKS4_REPLY_GRANTED,
    /// Request rejected or failed
    Rejected = SOCKS4_REPLY_REJECTED,
    /// Request rejected because the client is not running identd
    IdentdUnreachable = SOCKS4_REPLY_IDENTD_UNREACHABLE,
    /// Request rejected because identd could not confirm the user-id
    IdentdMismatch = SOCKS4_REPLY_IDENTD_MISMATCH,
}

impl Socks4ReplyCode {
    /// Parse a reply byte into a reply code
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS4_REPLY_GRANTED => Some(Socks4ReplyCode::Granted),
            SOCKS4_REPLY_REJECTED => Some(Socks4ReplyCode::Rejected),
            SOCKS4_REPLY_IDENTD_UNREACHABLE => Some(Socks4ReplyCode::IdentdUnreachable),
            SOCKS4_REPLY_IDENTD_MISMATCH => Some(Socks4ReplyCode::IdentdMismatch),
            _ => None,
        }
    }
}

impl From<Socks4ReplyCode> for u8 {
    fn from(code: Socks4ReplyCode) -> Self {
        code as u8
    }
}

/// Reply codes for the SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl Socks5ReplyCode {
    /// Parse a reply byte into a reply code
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Socks5ReplyCode::Succeeded),
            0x01 => Some(Socks5ReplyCode::GeneralFailure),
            0x02 => Some(Socks5ReplyCode::ConnectionNotAllowed),
            0x03 => Some(Socks5ReplyCode::NetworkUnreachable),
            0x04 => Some(Socks5ReplyCode::HostUnreachable),
            0x05 => Some(Socks5ReplyCode::ConnectionRefused),
            0x06 => Some(Socks5ReplyCode::TtlExpired),
            0x07 => Some(Socks5ReplyCode::CommandNotSupported),
            0x08 => Some(Socks5ReplyCode::AddressTypeNotSupported),
            _ => None,
        }
    }

    /// Human-readable description of the reply code
    pub fn description(&self) -> &'static str {
        match self {
            Socks5ReplyCode::Succeeded => "Succeeded",
            Socks5ReplyCode::GeneralFailure => "General SOCKS server failure",
            Socks5ReplyCode::ConnectionNotAllowed => "Connection not allowed by ruleset",
            Socks5ReplyCode::NetworkUnreachable => "Network unreachable",
            Socks5ReplyCode::HostUnreachable => "Host unreachable",
            Socks5ReplyCode::ConnectionRefused => "Connection refused",
            Socks5ReplyCode::TtlExpired => "TTL expired",
            Socks5ReplyCode::CommandNotSupported => "Command not supported",
            Socks5ReplyCode::AddressTypeNotSupported => "Address type not supported",
        }
    }
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

/// Render bytes as a space-separated hex dump for diagnostics
pub(crate) fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
