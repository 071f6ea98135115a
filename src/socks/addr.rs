//! Destination address handling
//!
//! A destination is either an IP literal or a domain name; the split decides
//! the SOCKS5 address type and whether SOCKS4 needs client-side resolution.

use super::consts::*;
use crate::error::{ProxyError, Socks4Error, Socks5Error};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Destination address for a proxy CONNECT
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address (v4 or v6) with port
    Ip(SocketAddr),
    /// Domain name with port, sent unresolved where the protocol allows
    Domain(String, u16),
}

impl TargetAddr {
    /// Classify a destination host string: IP literals become [`TargetAddr::Ip`],
    /// anything else a [`TargetAddr::Domain`].
    ///
    /// Bracketed IPv6 literals (`[::1]`) are accepted as the `url` crate
    /// serializes them that way.
    pub fn from_host_port(host: &str, port: u16) -> Result<Self, ProxyError> {
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(TargetAddr::Ip(SocketAddr::new(ip, port)));
        }
        if host.len() > MAX_DOMAIN_LEN {
            return Err(Socks5Error::InvalidDomain(format!(
                "domain name exceeds {} bytes: {}",
                MAX_DOMAIN_LEN, host
            ))
            .into());
        }
        if host.is_empty() {
            return Err(ProxyError::Config("destination host must not be empty".to_string()));
        }
        Ok(TargetAddr::Domain(host.to_string(), port))
    }

    /// Destination port
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// SOCKS5 address type byte for this destination
    pub fn addr_type(&self) -> u8 {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => SOCKS5_ADDR_TYPE_IPV4,
            TargetAddr::Ip(SocketAddr::V6(_)) => SOCKS5_ADDR_TYPE_IPV6,
            TargetAddr::Domain(_, _) => SOCKS5_ADDR_TYPE_DOMAIN,
        }
    }

    /// Serialize `ATYP + DST.ADDR + DST.PORT` in SOCKS5 wire form.
    ///
    /// Domain names are sent as-is, length-prefixed; the proxy resolves them.
    pub fn to_socks5_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV4);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV6);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Domain(domain, port) => {
                bytes.push(SOCKS5_ADDR_TYPE_DOMAIN);
                bytes.push(domain.len() as u8);
                bytes.extend_from_slice(domain.as_bytes());
                bytes.extend_from_slice(&port.to_be_bytes());
            }
        }
        bytes
    }

    /// Resolve to an IPv4 address for the SOCKS4 binary frame.
    ///
    /// Domain names go through DNS; IPv6-only destinations cannot be
    /// expressed in SOCKS4.
    pub async fn resolve_v4(&self) -> Result<Ipv4Addr, ProxyError> {
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => Ok(*addr.ip()),
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                Err(Socks4Error::NoIpv4Address(addr.ip().to_string()).into())
            }
            TargetAddr::Domain(domain, port) => {
                let addrs = tokio::net::lookup_host((domain.as_str(), *port))
                    .await
                    .map_err(|e| ProxyError::Dns(format!("failed to resolve {}: {}", domain, e)))?;
                for addr in addrs {
                    if let SocketAddr::V4(v4) = addr {
                        return Ok(*v4.ip());
                    }
                }
                Err(Socks4Error::NoIpv4Address(domain.clone()).into())
            }
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}
