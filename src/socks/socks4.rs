//! SOCKS4 and SOCKS4a CONNECT handshake
//!
//! The two variants share one frame layout; SOCKS4a replaces the binary
//! IPv4 address with the sentinel 0.0.0.1 and appends the NUL-terminated
//! hostname so the proxy resolves it. The variant is a parameter
//! (`remote_dns`), not a separate implementation.

use super::addr::TargetAddr;
use super::consts::*;
use crate::error::{ProxyError, Socks4Error, Socks4ReplyCode};
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Build the SOCKS4/4a CONNECT request frame.
///
/// `domain` is appended (NUL-terminated) only for SOCKS4a domain mode,
/// where `addr` must be the sentinel 0.0.0.1.
fn encode_request(
    addr: Ipv4Addr,
    port: u16,
    user_id: &str,
    domain: Option<&str>,
) -> Result<Vec<u8>, ProxyError> {
    if user_id.contains('\0') {
        return Err(Socks4Error::InvalidUserId(user_id.to_string()).into());
    }

    let mut frame = vec![SOCKS4_VERSION, SOCKS4_CMD_CONNECT];
    frame.extend_from_slice(&port.to_be_bytes());
    frame.extend_from_slice(&addr.octets());
    frame.extend_from_slice(user_id.as_bytes());
    frame.push(0x00);
    if let Some(domain) = domain {
        frame.extend_from_slice(domain.as_bytes());
        frame.push(0x00);
    }
    Ok(frame)
}

/// Perform the SOCKS4 (or SOCKS4a, when `remote_dns` is set) CONNECT
/// handshake on an established proxy connection.
///
/// With `remote_dns`, domain destinations are passed through unresolved;
/// IP destinations always use the plain SOCKS4 binary frame.
pub async fn handshake<S>(
    stream: &mut S,
    target: &TargetAddr,
    user_id: Option<&str>,
    remote_dns: bool,
) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let user_id = user_id.unwrap_or("");

    let frame = match target {
        TargetAddr::Domain(domain, port) if remote_dns => encode_request(
            Ipv4Addr::from(SOCKS4A_SENTINEL_ADDR),
            *port,
            user_id,
            Some(domain),
        )?,
        _ => {
            let addr = target.resolve_v4().await?;
            encode_request(addr, target.port(), user_id, None)?
        }
    };

    stream.write_all(&frame).await?;
    stream.flush().await?;

    let mut reply = [0u8; SOCKS4_REPLY_LEN];
    stream.read_exact(&mut reply).await?;

    match Socks4ReplyCode::from_byte(reply[1]) {
        Some(Socks4ReplyCode::Granted) => {
            tracing::debug!(target = %target, "SOCKS4 tunnel granted");
            Ok(())
        }
        Some(Socks4ReplyCode::Rejected) => Err(Socks4Error::Rejected.into()),
        Some(Socks4ReplyCode::IdentdUnreachable) => Err(Socks4Error::IdentdUnreachable.into()),
        Some(Socks4ReplyCode::IdentdMismatch) => Err(Socks4Error::IdentdMismatch.into()),
        None => Err(Socks4Error::UnknownReply(reply[1]).into()),
    }
}
