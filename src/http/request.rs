//! HTTP request encoding
//!
//! Builds raw HTTP/1.1 request bytes. SOCKS tunnels carry origin-form
//! request lines; the plain HTTP relay mode sends the absolute destination
//! URI so the proxy can route it.

use crate::error::ProxyError;
use std::fmt;
use url::Url;

/// HTTP request methods supported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
}

impl Method {
    /// Wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse and validate a destination URL.
///
/// The URL must be an absolute URI with scheme `http` or `https` and a
/// non-empty host. Validation happens before any socket is opened.
pub fn parse_destination(url: &str) -> Result<Url, ProxyError> {
    let parsed = Url::parse(url)
        .map_err(|e| ProxyError::Config(format!("invalid destination URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ProxyError::Config(format!(
                "unsupported URL scheme '{}': expected http or https",
                other
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ProxyError::Config(format!(
            "destination URL '{}' has no host",
            url
        )));
    }

    if parsed.port() == Some(0) {
        return Err(ProxyError::Config(format!(
            "destination URL '{}' has port 0; expected 1-65535",
            url
        )));
    }

    Ok(parsed)
}

/// A single outgoing HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    /// Validated destination URL
    pub url: Url,
    /// Request method
    pub method: Method,
    /// Optional request body (POST/PUT)
    pub body: Option<String>,
    /// Caller-supplied headers, serialized in order
    pub headers: Vec<(String, String)>,
    /// Caller-supplied cookies, joined into a single `Cookie` header
    pub cookies: Vec<(String, String)>,
    /// Whether to ask the server to keep the connection open
    pub keep_alive: bool,
}

impl Request {
    /// Create a request with no headers, cookies or body
    pub fn new(method: Method, url: Url) -> Self {
        Request {
            url,
            method,
            body: None,
            headers: Vec::new(),
            cookies: Vec::new(),
            keep_alive: true,
        }
    }

    /// Destination host as it appears in the URL
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Destination port, falling back to the scheme default
    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(80)
    }

    /// Whether the destination scheme requires a TLS tunnel
    pub fn is_tls(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Value of the `Host` header: port is included only when non-default
    fn host_header(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    /// Request target: absolute URI for the HTTP relay mode, origin-form
    /// path otherwise
    fn request_target(&self, absolute_form: bool) -> String {
        if absolute_form {
            return self.url.as_str().to_string();
        }
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Serialize the request into raw HTTP/1.1 wire bytes
    pub fn encode(&self, absolute_form: bool) -> Vec<u8> {
        let mut out = String::new();

        out.push_str(self.method.as_str());
        out.push(' ');
        out.push_str(&self.request_target(absolute_form));
        out.push_str(" HTTP/1.1\r\n");

        out.push_str("Host: ");
        out.push_str(&self.host_header());
        out.push_str("\r\n");

        out.push_str(if self.keep_alive {
            "Connection: keep-alive\r\n"
        } else {
            "Connection: close\r\n"
        });

        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }

        if !self.cookies.is_empty() {
            let pairs: Vec<String> = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            out.push_str("Cookie: ");
            out.push_str(&pairs.join("; "));
            out.push_str("\r\n");
        }

        if let Some(ref body) = self.body {
            out.push_str(&format!("Content-Length: {}\r\n", body.len()));
            out.push_str("\r\n");
            out.push_str(body);
        } else {
            out.push_str("\r\n");
        }

        out.into_bytes()
    }
}
