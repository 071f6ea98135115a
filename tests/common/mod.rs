//! Test utilities and mock proxy servers for Socksmith
//!
//! In-process TCP servers that speak the server side of each proxy
//! protocol, then serve canned HTTP responses. Received requests and
//! accepted-connection counts are recorded for assertions.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing_subscriber::EnvFilter;

/// Install the test log subscriber; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Server-side behavior of a mock proxy
#[derive(Debug, Clone)]
pub enum MockProto {
    /// Plain HTTP relay: no handshake, requests arrive directly
    HttpRelay,
    /// SOCKS4/4a server, always granting
    Socks4,
    /// SOCKS5 server; with credentials it demands username/password
    Socks5 { auth: Option<(String, String)> },
    /// SOCKS5 server replying "no acceptable methods"
    Socks5Reject,
    /// Accepts and reads the request but never responds
    Stall,
}

/// Handle to a running mock proxy
pub struct MockProxy {
    /// Address the proxy listens on
    pub addr: SocketAddr,
    /// Number of TCP connections accepted so far
    pub connections: Arc<AtomicUsize>,
    /// Raw HTTP requests observed, in arrival order
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl MockProxy {
    /// Number of accepted connections
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Snapshot of observed requests
    pub fn observed_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Spawn a mock proxy that answers every HTTP request with `response`
pub async fn spawn_proxy(proto: MockProto, response: Vec<u8>) -> MockProxy {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let response = Arc::new(response);

    let conn_counter = connections.clone();
    let request_log = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            conn_counter.fetch_add(1, Ordering::SeqCst);
            let proto = proto.clone();
            let response = response.clone();
            let request_log = request_log.clone();
            tokio::spawn(async move {
                let _ = serve_connection(stream, proto, response, request_log).await;
            });
        }
    });

    MockProxy {
        addr,
        connections,
        requests,
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    proto: MockProto,
    response: Arc<Vec<u8>>,
    request_log: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    match &proto {
        MockProto::HttpRelay | MockProto::Stall => {}
        MockProto::Socks4 => socks4_accept(&mut stream).await?,
        MockProto::Socks5 { auth } => socks5_accept(&mut stream, auth.as_ref()).await?,
        MockProto::Socks5Reject => {
            let mut greeting = [0u8; 2];
            stream.read_exact(&mut greeting).await?;
            let mut methods = vec![0u8; greeting[1] as usize];
            stream.read_exact(&mut methods).await?;
            stream.write_all(&[0x05, 0xFF]).await?;
            return Ok(());
        }
    }

    while let Some(request) = read_request(&mut stream).await {
        request_log.lock().unwrap().push(request);
        if matches!(proto, MockProto::Stall) {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            return Ok(());
        }
        stream.write_all(&response).await?;
        stream.flush().await?;
    }
    Ok(())
}

/// Server side of the SOCKS4/4a handshake, always granting
async fn socks4_accept(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut fixed = [0u8; 8];
    stream.read_exact(&mut fixed).await?;
    read_nul_terminated(stream).await?; // user-id
    if fixed[4..7] == [0, 0, 0] && fixed[7] != 0 {
        // SOCKS4a sentinel: the hostname follows
        read_nul_terminated(stream).await?;
    }
    stream.write_all(&[0x00, 90, 0, 0, 0, 0, 0, 0]).await?;
    Ok(())
}

/// Server side of the SOCKS5 handshake, granting the CONNECT
async fn socks5_accept(
    stream: &mut TcpStream,
    auth: Option<&(String, String)>,
) -> std::io::Result<()> {
    let mut greeting = [0u8; 2];
    stream.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    stream.read_exact(&mut methods).await?;

    if let Some((username, password)) = auth {
        stream.write_all(&[0x05, 0x02]).await?;

        let mut header = [0u8; 2];
        stream.read_exact(&mut header).await?;
        let mut user = vec![0u8; header[1] as usize];
        stream.read_exact(&mut user).await?;
        let plen = stream.read_u8().await?;
        let mut pass = vec![0u8; plen as usize];
        stream.read_exact(&mut pass).await?;

        let ok = user == username.as_bytes() && pass == password.as_bytes();
        stream.write_all(&[0x01, if ok { 0x00 } else { 0x01 }]).await?;
        if !ok {
            return Ok(());
        }
    } else {
        stream.write_all(&[0x05, 0x00]).await?;
    }

    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await?;
    let addr_len = match head[3] {
        0x01 => 4,
        0x04 => 16,
        0x03 => stream.read_u8().await? as usize,
        _ => 0,
    };
    let mut rest = vec![0u8; addr_len + 2];
    stream.read_exact(&mut rest).await?;

    stream
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await?;
    Ok(())
}

async fn read_nul_terminated<S>(stream: &mut S) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    loop {
        let byte = stream.read_u8().await?;
        if byte == 0 {
            return Ok(out);
        }
        out.push(byte);
    }
}

/// Read one HTTP request (head plus Content-Length-delimited body) off
/// the stream. Returns `None` on EOF before a complete request.
pub async fn read_request<S>(stream: &mut S) -> Option<String>
where
    S: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head.lines().find_map(|line| {
        let (name, value) = line.split_once(": ")?;
        if name.eq_ignore_ascii_case("content-length") {
            value.trim().parse::<usize>().ok()
        } else {
            None
        }
    });

    let mut body = buf[head_end + 4..].to_vec();
    if let Some(length) = content_length {
        while body.len() < length {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    }

    Some(format!(
        "{}\r\n\r\n{}",
        head,
        String::from_utf8_lossy(&body)
    ))
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// A canned 200 response with a length-delimited body
pub fn ok_response(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}
