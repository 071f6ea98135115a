//! Decoded HTTP response
//!
//! The structured result handed back to callers once a syntactically
//! complete HTTP message has been read off the tunnel.

use crate::timing::Timings;
use std::collections::HashMap;

/// A fully decoded HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code from the status line
    pub status: u16,
    /// Response headers; on duplicate names the last occurrence wins
    pub headers: HashMap<String, String>,
    /// Cookies collected from `Set-Cookie` headers, in arrival order
    pub cookies: Vec<(String, String)>,
    /// Response body decoded as UTF-8 (lossy)
    pub body: String,
    /// Wall-clock timings for this request
    pub timings: Timings,
}

impl Response {
    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a cookie value by name
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status code is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
