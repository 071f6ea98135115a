//! SOCKS5 CONNECT handshake
//!
//! Two-phase negotiation: authentication method selection (with optional
//! username/password subnegotiation, RFC 1929) followed by the CONNECT
//! command (RFC 1928). The client always advertises no-auth and
//! username/password; domain destinations are sent unresolved so the proxy
//! does the DNS lookup.

use super::addr::TargetAddr;
use super::consts::*;
use crate::config::Credentials;
use crate::error::{hex_dump, ProxyError, Socks5Error, Socks5ReplyCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Perform the SOCKS5 handshake on an established proxy connection.
///
/// `credentials` are only sent when the server selects username/password;
/// a server demanding them while none are configured is an error rather
/// than a silent downgrade.
pub async fn handshake<S>(
    stream: &mut S,
    target: &TargetAddr,
    credentials: Option<&Credentials>,
) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    negotiate_method(stream, credentials).await?;
    connect(stream, target).await
}

/// Phase one: advertise supported methods and run the selected
/// subnegotiation
async fn negotiate_method<S>(
    stream: &mut S,
    credentials: Option<&Credentials>,
) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let greeting = [
        SOCKS5_VERSION,
        2,
        SOCKS5_AUTH_METHOD_NONE,
        SOCKS5_AUTH_METHOD_PASSWORD,
    ];
    stream.write_all(&greeting).await?;
    stream.flush().await?;

    let mut selection = [0u8; 2];
    stream.read_exact(&mut selection).await?;
    if selection[0] != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(selection[0]).into());
    }

    match selection[1] {
        SOCKS5_AUTH_METHOD_NONE => {
            tracing::debug!("SOCKS5 proxy selected no-auth");
            Ok(())
        }
        SOCKS5_AUTH_METHOD_PASSWORD => match credentials {
            Some(credentials) => authenticate(stream, credentials).await,
            None => Err(Socks5Error::AuthRequired.into()),
        },
        SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE => Err(Socks5Error::NoAcceptableMethod.into()),
        other => Err(Socks5Error::UnsupportedMethod(other).into()),
    }
}

/// Username/password subnegotiation frame:
/// `[0x01][ulen][user][plen][pass]`
async fn authenticate<S>(stream: &mut S, credentials: &Credentials) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut frame = vec![SOCKS5_AUTH_VERSION, credentials.username.len() as u8];
    frame.extend_from_slice(credentials.username.as_bytes());
    frame.push(credentials.password.len() as u8);
    frame.extend_from_slice(credentials.password.as_bytes());
    stream.write_all(&frame).await?;
    stream.flush().await?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await?;
    if reply[1] != 0x00 {
        return Err(Socks5Error::AuthFailed.into());
    }
    tracing::debug!("SOCKS5 username/password authentication accepted");
    Ok(())
}

/// Phase two: CONNECT command and reply, consuming the bound address
async fn connect<S>(stream: &mut S, target: &TargetAddr) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = vec![SOCKS5_VERSION, SOCKS5_CMD_TCP_CONNECT, SOCKS5_RESERVED];
    request.extend_from_slice(&target.to_socks5_bytes());
    stream.write_all(&request).await?;
    stream.flush().await?;

    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await?;
    if head[0] != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(head[0]).into());
    }

    if head[1] != u8::from(Socks5ReplyCode::Succeeded) {
        return Err(match Socks5ReplyCode::from_byte(head[1]) {
            Some(code) => Socks5Error::Connect {
                code,
                reply: hex_dump(&head),
            },
            None => Socks5Error::UnknownReply {
                code: head[1],
                reply: hex_dump(&head),
            },
        }
        .into());
    }

    // Bound address: length depends on the reply's address type
    let addr_len = match head[3] {
        SOCKS5_ADDR_TYPE_IPV4 => 4,
        SOCKS5_ADDR_TYPE_IPV6 => 16,
        SOCKS5_ADDR_TYPE_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            len[0] as usize
        }
        other => return Err(Socks5Error::AddressTypeNotSupported(other).into()),
    };
    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound).await?;

    tracing::debug!(target = %target, "SOCKS5 tunnel granted");
    Ok(())
}
