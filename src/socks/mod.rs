//! SOCKS protocol handshakes
//!
//! Client-side CONNECT negotiation for SOCKS4, SOCKS4a and SOCKS5. Each
//! handshake runs over any async byte stream and leaves the stream positioned
//! at the start of the tunneled connection on success.

pub mod addr;
pub mod consts;
pub mod socks4;
pub mod socks5;

pub use addr::TargetAddr;
pub use consts::*;
