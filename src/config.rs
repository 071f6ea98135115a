//! Configuration types for Socksmith
//!
//! Defines proxy endpoints, credentials and TLS options. All types validate
//! eagerly so misconfiguration surfaces at construction time, before any
//! network IO happens.

use crate::error::ProxyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Address of the intermediary proxy server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    /// Proxy hostname or IP address
    pub host: String,
    /// Proxy port (1-65535)
    pub port: u16,
}

impl ProxyEndpoint {
    /// Create a new proxy endpoint, validating host and port
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ProxyError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ProxyError::Config("proxy host must not be empty".to_string()));
        }
        if port == 0 {
            return Err(ProxyError::Config("proxy port must be in 1..=65535".to_string()));
        }
        Ok(ProxyEndpoint { host, port })
    }

    /// The `host:port` form used for connecting and error context
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Username/password pair for SOCKS5 authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username (up to 255 bytes)
    pub username: String,
    /// Password (up to 255 bytes)
    pub password: String,
}

impl Credentials {
    /// Create a credentials pair, validating wire-format length limits
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ProxyError> {
        let username = username.into();
        let password = password.into();
        if username.len() > 255 || password.len() > 255 {
            return Err(ProxyError::Config(
                "SOCKS5 username and password must each be at most 255 bytes".to_string(),
            ));
        }
        Ok(Credentials { username, password })
    }
}

/// TLS options for `https` destinations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsOptions {
    /// Skip certificate verification. Dangerous, test use only.
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,

    /// Additional trusted root certificate in PEM format
    #[serde(default)]
    pub trusted_root: Option<PathBuf>,
}
