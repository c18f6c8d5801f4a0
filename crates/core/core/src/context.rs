//! Request context passed explicitly through the call chain.
//!
//! There is no thread-local request state anywhere in the service; handlers
//! build a `RequestParts` and pass it down as an argument.

use std::collections::HashMap;

/// Request metadata extracted from HTTP requests.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    /// Transport-level peer address.
    pub peer_addr: Option<String>,
    /// HTTP headers (lowercase keys).
    pub headers: HashMap<String, String>,
}

impl RequestParts {
    /// Creates new empty request parts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the peer address.
    pub fn with_peer_addr(mut self, addr: impl Into<String>) -> Self {
        self.peer_addr = Some(addr.into());
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&String> {
        self.headers.get(&key.to_lowercase())
    }

    /// Resolves the client IP for rate limiting.
    ///
    /// Honors `X-Forwarded-For` (first entry of a comma-separated list),
    /// then `X-Real-IP`, then the transport-level peer address.
    pub fn client_ip(&self) -> Option<String> {
        if let Some(forwarded) = self.get_header("x-forwarded-for") {
            let first = forwarded.split(',').next().map(str::trim);
            if let Some(ip) = first.filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("unknown"))
            {
                return Some(ip.to_string());
            }
        }

        if let Some(real_ip) = self.get_header("x-real-ip") {
            if !real_ip.is_empty() && !real_ip.eq_ignore_ascii_case("unknown") {
                return Some(real_ip.clone());
            }
        }

        self.peer_addr.clone()
    }
}
