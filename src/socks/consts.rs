//! SOCKS protocol constants
//!
//! Defines all constants used in the SOCKS4/4a and SOCKS5 protocol
//! implementations.

/// SOCKS4 protocol version
pub const SOCKS4_VERSION: u8 = 0x04;

/// SOCKS4 CONNECT command
pub const SOCKS4_CMD_CONNECT: u8 = 0x01;

/// Fixed length of a SOCKS4 reply frame
pub const SOCKS4_REPLY_LEN: usize = 8;

// SOCKS4 reply codes
/// Request granted
pub const SOCKS4_REPLY_GRANTED: u8 = 90;
/// Request rejected or failed
pub const SOCKS4_REPLY_REJECTED: u8 = 91;
/// Request rejected: client not running identd
pub const SOCKS4_REPLY_IDENTD_UNREACHABLE: u8 = 92;
/// Request rejected: identd could not confirm the user-id
pub const SOCKS4_REPLY_IDENTD_MISMATCH: u8 = 93;

/// Sentinel destination address (0.0.0.1) signalling SOCKS4a domain mode
pub const SOCKS4A_SENTINEL_ADDR: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

/// SOCKS5 authentication sub-negotiation version
pub const SOCKS5_AUTH_VERSION: u8 = 0x01;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// Username/password authentication
pub const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

/// Maximum domain name length
pub const MAX_DOMAIN_LEN: usize = 255;
