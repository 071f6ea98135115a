//! HTTP response decoding
//!
//! Reads raw bytes off the tunnel in fixed-size chunks and splits them into
//! status line, headers and body. The body is delimited by `Content-Length`
//! or chunked transfer-encoding; a response with neither is a framing error
//! because it cannot be safely delimited on a raw stream.

use super::READ_CHUNK_SIZE;
use crate::error::ProxyError;
use bytes::BytesMut;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Result of decoding one HTTP response off the wire
#[derive(Debug)]
pub struct DecodedResponse {
    /// Status code from the status line
    pub status: u16,
    /// Headers, last occurrence winning on duplicates
    pub headers: HashMap<String, String>,
    /// Cookies routed out of `Set-Cookie` headers
    pub cookies: Vec<(String, String)>,
    /// Body bytes decoded as UTF-8 (lossy)
    pub body: String,
    /// Elapsed time when the first read returned, relative to `started`
    pub first_byte: Duration,
}

/// Byte source that records when the first read returns
struct Source<'a, S> {
    stream: &'a mut S,
    started: Instant,
    first_byte: Option<Duration>,
}

impl<S: AsyncRead + Unpin> Source<'_, S> {
    /// Read one chunk into `buf`; EOF is a framing error described by `what`
    async fn fill(&mut self, buf: &mut BytesMut, what: &str) -> Result<(), ProxyError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let n = self.stream.read(&mut chunk).await?;
        if self.first_byte.is_none() {
            self.first_byte = Some(self.started.elapsed());
        }
        if n == 0 {
            return Err(ProxyError::Framing(format!(
                "connection closed while reading {}",
                what
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }
}

/// Read and decode one complete HTTP response from `stream`.
///
/// `started` anchors the first-byte timing; pass the instant the request
/// was written.
pub async fn read_response<S>(
    stream: &mut S,
    started: Instant,
) -> Result<DecodedResponse, ProxyError>
where
    S: AsyncRead + Unpin,
{
    let mut source = Source {
        stream,
        started,
        first_byte: None,
    };
    let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);

    // Accumulate until the header/body separator shows up
    let header_end = loop {
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos;
        }
        source.fill(&mut buf, "response headers").await?;
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut body_buf = BytesMut::from(&buf[header_end + 4..]);

    let mut lines = head.split("\r\n");
    let status_line = lines
        .next()
        .ok_or_else(|| ProxyError::Framing("empty response head".to_string()))?;
    let status = parse_status_line(status_line)?;

    let mut headers = HashMap::new();
    let mut cookies = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(": ").ok_or_else(|| {
            ProxyError::Framing(format!("malformed header line: '{}'", line))
        })?;
        if name.eq_ignore_ascii_case("set-cookie") {
            if let Some(cookie) = parse_set_cookie(value) {
                cookies.push(cookie);
            }
        } else {
            headers.insert(name.to_string(), value.to_string());
        }
    }

    let body = if let Some(length) = header_value(&headers, "content-length") {
        let length: usize = length.trim().parse().map_err(|_| {
            ProxyError::Framing(format!("invalid Content-Length: '{}'", length))
        })?;
        tracing::debug!(length, "decoding length-delimited body");
        while body_buf.len() < length {
            source.fill(&mut body_buf, "response body").await?;
        }
        body_buf.truncate(length);
        body_buf
    } else if header_value(&headers, "transfer-encoding")
        .map_or(false, |v| v.to_ascii_lowercase().contains("chunked"))
    {
        tracing::debug!("decoding chunked body");
        read_chunked_body(&mut source, body_buf).await?
    } else {
        return Err(ProxyError::Framing(
            "unknown content framing: response has neither Content-Length nor chunked \
             transfer-encoding"
                .to_string(),
        ));
    };

    Ok(DecodedResponse {
        status,
        headers,
        cookies,
        body: String::from_utf8_lossy(&body).into_owned(),
        first_byte: source.first_byte.unwrap_or_default(),
    })
}

/// Consume chunked transfer-encoding: hex size line, chunk bytes plus CRLF,
/// terminated by a zero-size chunk
async fn read_chunked_body<S>(
    source: &mut Source<'_, S>,
    mut buf: BytesMut,
) -> Result<BytesMut, ProxyError>
where
    S: AsyncRead + Unpin,
{
    let mut body = BytesMut::new();
    loop {
        let line_end = loop {
            if let Some(pos) = find_subsequence(&buf, b"\r\n") {
                break pos;
            }
            source.fill(&mut buf, "chunk size line").await?;
        };

        let size_line = String::from_utf8_lossy(&buf[..line_end]).into_owned();
        // Chunk extensions after ';' are ignored
        let size_field = size_line.split(';').next().unwrap_or("").trim().to_string();
        let size = usize::from_str_radix(&size_field, 16).map_err(|_| {
            ProxyError::Framing(format!("invalid chunk size line: '{}'", size_line))
        })?;
        let _ = buf.split_to(line_end + 2);

        if size == 0 {
            // Trailing CRLF after the terminating chunk
            while buf.len() < 2 {
                source.fill(&mut buf, "chunked body terminator").await?;
            }
            return Ok(body);
        }

        while buf.len() < size + 2 {
            source.fill(&mut buf, "chunk data").await?;
        }
        body.extend_from_slice(&buf[..size]);
        let _ = buf.split_to(size + 2);
    }
}

/// Parse the 3-digit status code out of an HTTP/1.x status line
fn parse_status_line(line: &str) -> Result<u16, ProxyError> {
    let code = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ProxyError::Framing(format!("malformed status line: '{}'", line)))?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProxyError::Framing(format!(
            "malformed status code in status line: '{}'",
            line
        )));
    }
    code.parse()
        .map_err(|_| ProxyError::Framing(format!("malformed status line: '{}'", line)))
}

/// Extract the name/value pair from a `Set-Cookie` value, dropping attributes
fn parse_set_cookie(value: &str) -> Option<(String, String)> {
    let pair = value.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

/// Case-insensitive header lookup
fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// First position of `needle` in `haystack`
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt};

    async fn decode(response: &'static [u8]) -> Result<DecodedResponse, ProxyError> {
        let (mut client, mut server) = duplex(READ_CHUNK_SIZE);
        let writer = tokio::spawn(async move {
            server.write_all(response).await.unwrap();
            drop(server);
        });
        let decoded = read_response(&mut client, Instant::now()).await;
        writer.await.unwrap();
        decoded
    }

    #[tokio::test]
    async fn test_content_length_body() {
        let decoded = decode(
            b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\ntestContent",
        )
        .await
        .unwrap();
        assert_eq!(decoded.status, 200);
        assert_eq!(decoded.body, "testContent");
    }

    #[tokio::test]
    async fn test_chunked_body() {
        let decoded = decode(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nb\r\ntestContent\r\n0\r\n\r\n",
        )
        .await
        .unwrap();
        assert_eq!(decoded.status, 200);
        assert_eq!(decoded.body, "testContent");
    }

    #[tokio::test]
    async fn test_framing_equivalence() {
        // Both framings must decode identical logical content identically
        let by_length = decode(
            b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\ntestContent",
        )
        .await
        .unwrap();
        let by_chunks = decode(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nb\r\ntestContent\r\n0\r\n\r\n",
        )
        .await
        .unwrap();
        assert_eq!(by_length.body, by_chunks.body);
    }

    #[tokio::test]
    async fn test_chunked_multiple_chunks() {
        let decoded = decode(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
              4\r\ntest\r\n7\r\nContent\r\n0\r\n\r\n",
        )
        .await
        .unwrap();
        assert_eq!(decoded.body, "testContent");
    }

    #[tokio::test]
    async fn test_chunked_with_extension() {
        let decoded = decode(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
              b;name=value\r\ntestContent\r\n0\r\n\r\n",
        )
        .await
        .unwrap();
        assert_eq!(decoded.body, "testContent");
    }

    #[tokio::test]
    async fn test_missing_framing_is_error() {
        let err = decode(b"HTTP/1.1 200 OK\r\nServer: test\r\n\r\nbody").await;
        match err {
            Err(ProxyError::Framing(msg)) => assert!(msg.contains("unknown content framing")),
            other => panic!("expected framing error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_status_line() {
        let err = decode(b"HTTP/1.1\r\nContent-Length: 0\r\n\r\n").await;
        assert!(matches!(err, Err(ProxyError::Framing(_))));

        let err = decode(b"HTTP/1.1 2x0 OK\r\nContent-Length: 0\r\n\r\n").await;
        assert!(matches!(err, Err(ProxyError::Framing(_))));
    }

    #[tokio::test]
    async fn test_set_cookie_routed_to_cookies() {
        let decoded = decode(
            b"HTTP/1.1 200 OK\r\n\
              Set-Cookie: session=abc123; Path=/; HttpOnly\r\n\
              Set-Cookie: theme=dark\r\n\
              Content-Length: 0\r\n\r\n",
        )
        .await
        .unwrap();
        assert_eq!(
            decoded.cookies,
            vec![
                ("session".to_string(), "abc123".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
        assert!(!decoded.headers.keys().any(|k| k.eq_ignore_ascii_case("set-cookie")));
    }

    #[tokio::test]
    async fn test_duplicate_header_last_wins() {
        let decoded = decode(
            b"HTTP/1.1 200 OK\r\n\
              X-Test: first\r\n\
              X-Test: second\r\n\
              Content-Length: 0\r\n\r\n",
        )
        .await
        .unwrap();
        assert_eq!(decoded.headers.get("X-Test").map(String::as_str), Some("second"));
    }

    #[tokio::test]
    async fn test_empty_body_with_zero_length() {
        let decoded = decode(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(decoded.status, 204);
        assert_eq!(decoded.body, "");
    }

    #[tokio::test]
    async fn test_split_reads_across_header_and_body() {
        // A tiny duplex capacity forces the decoder through many partial reads
        let (mut client, mut server) = duplex(4);
        let writer = tokio::spawn(async move {
            server
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\ntestContent")
                .await
                .unwrap();
            drop(server);
        });
        let decoded = read_response(&mut client, Instant::now()).await.unwrap();
        writer.await.unwrap();
        assert_eq!(decoded.status, 200);
        assert_eq!(decoded.body, "testContent");
    }

    #[tokio::test]
    async fn test_split_reads_chunked() {
        let (mut client, mut server) = duplex(3);
        let writer = tokio::spawn(async move {
            server
                .write_all(
                    b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                      b\r\ntestContent\r\n0\r\n\r\n",
                )
                .await
                .unwrap();
            drop(server);
        });
        let decoded = read_response(&mut client, Instant::now()).await.unwrap();
        writer.await.unwrap();
        assert_eq!(decoded.body, "testContent");
    }

    #[tokio::test]
    async fn test_truncated_body_is_error() {
        let err = decode(b"HTTP/1.1 200 OK\r\nContent-Length: 50\r\n\r\nshort").await;
        assert!(matches!(err, Err(ProxyError::Framing(_))));
    }

    #[tokio::test]
    async fn test_first_byte_recorded() {
        let decoded = decode(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
            .await
            .unwrap();
        assert!(decoded.first_byte > Duration::ZERO);
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(parse_status_line("HTTP/1.1 200 OK").unwrap(), 200);
        assert_eq!(parse_status_line("HTTP/1.0 404 Not Found").unwrap(), 404);
        assert!(parse_status_line("HTTP/1.1").is_err());
        assert!(parse_status_line("HTTP/1.1 20 OK").is_err());
        assert!(parse_status_line("HTTP/1.1 2000 OK").is_err());
    }

    #[test]
    fn test_parse_set_cookie() {
        assert_eq!(
            parse_set_cookie("name=value; Path=/; Secure"),
            Some(("name".to_string(), "value".to_string()))
        );
        assert_eq!(
            parse_set_cookie("flag="),
            Some(("flag".to_string(), "".to_string()))
        );
        assert_eq!(parse_set_cookie("malformed"), None);
    }

    #[test]
    fn test_find_subsequence() {
        assert_eq!(find_subsequence(b"abc\r\n\r\ndef", b"\r\n\r\n"), Some(3));
        assert_eq!(find_subsequence(b"abcdef", b"\r\n\r\n"), None);
        assert_eq!(find_subsequence(b"", b"\r\n"), None);
    }
}
