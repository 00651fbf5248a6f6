use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for requests and responses.
///
/// Names are `Arc<str>` since most are static strings repeated on every
/// response (`content-type`, `x-request-id`, ...).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// Canonical reason phrase for a status, `"Unknown"` when there is none.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// A fully serialized HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Response {
    /// Empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    /// Response with a body and its content type.
    #[must_use]
    pub fn with_body(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        let mut res = Self::new(status);
        res.set_header("content-type", content_type.to_owned());
        res.body = body;
        res
    }

    /// JSON-encode `body`.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::with_body(status, CONTENT_TYPE_JSON, body.to_string().into_bytes())
    }

    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::with_body(status, CONTENT_TYPE_TEXT, body.into().into_bytes())
    }

    #[must_use]
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::with_body(status, CONTENT_TYPE_HTML, body.into().into_bytes())
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Body as UTF-8, if it is.
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Body parsed as JSON, if it is.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(456), "Unknown");
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut res = Response::json(200, &json!({"ok": true}));
        res.set_header("Content-Type", "application/problem+json".into());
        assert_eq!(res.headers.len(), 1);
        assert_eq!(res.header("content-type"), Some("application/problem+json"));
        assert_eq!(res.body_json(), Some(json!({"ok": true})));
    }
}
