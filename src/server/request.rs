use super::response::HeaderVec;
use crate::router::ParamVec;
use http::Method;
use serde_json::Value;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

/// Readable request body that is drained at most once.
///
/// Whatever the dispatcher does not consume is read to the end and discarded
/// either by an explicit [`Body::drain`] or on drop, so the underlying
/// connection is never left holding unread bytes.
pub struct Body {
    source: Option<Box<dyn Read + Send>>,
}

/// Outcome of [`Body::read_limited`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRead {
    Complete(Vec<u8>),
    /// More than the limit was available; the rest has been drained.
    TooLarge,
}

impl Body {
    #[must_use]
    pub fn empty() -> Self {
        Self { source: None }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(Cursor::new(bytes.into()))
    }

    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            source: Some(Box::new(reader)),
        }
    }

    /// Whether the body has already been consumed or drained.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.source.is_none()
    }

    /// Read the whole body, up to `limit` bytes.
    ///
    /// Consumes the body: later reads return an empty `Complete`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying reader.
    pub fn read_limited(&mut self, limit: usize) -> io::Result<BodyRead> {
        let Some(mut source) = self.source.take() else {
            return Ok(BodyRead::Complete(Vec::new()));
        };
        let mut buf = Vec::new();
        let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
        (&mut source).take(cap).read_to_end(&mut buf)?;
        if buf.len() > limit {
            io::copy(&mut source, &mut io::sink())?;
            return Ok(BodyRead::TooLarge);
        }
        Ok(BodyRead::Complete(buf))
    }

    /// Read and discard whatever is left. A no-op after the first call.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying reader.
    pub fn drain(&mut self) -> io::Result<u64> {
        match self.source.take() {
            Some(mut source) => io::copy(&mut source, &mut io::sink()),
            None => Ok(0),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("drained", &self.is_drained())
            .finish()
    }
}

impl Drop for Body {
    fn drop(&mut self) {
        if let Err(e) = self.drain() {
            tracing::warn!(error = %e, "Failed to drain request body");
        }
    }
}

/// An already-parsed inbound request.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    /// Path plus optional query string, e.g. `/pets?limit=10`.
    pub url: String,
    pub headers: HeaderVec,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderVec::new(),
            body: Body::empty(),
        }
    }

    #[must_use]
    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// JSON-encode `value` as the body and set the content type.
    #[must_use]
    pub fn json(self, value: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(Body::from_bytes(value.to_string()))
    }

    /// The path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        match self.url.find('?') {
            Some(pos) => &self.url[..pos],
            None => &self.url,
        }
    }

    /// Raw query string after `?`, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.url.find('?').map(|pos| &self.url[pos + 1..])
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a query string into `(name, value)` pairs, URL-decoded.
///
/// Repeated names are all kept in order; lookups use the last one.
#[must_use]
pub fn parse_query(query: Option<&str>) -> ParamVec {
    let mut params = ParamVec::new();
    if let Some(q) = query {
        for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
            params.push((Arc::from(k.as_ref()), v.into_owned()));
        }
    }
    params
}

/// Parse the `Cookie` header into `(name, value)` pairs.
#[must_use]
pub fn parse_cookies(header: Option<&str>) -> HeaderVec {
    header
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim();
                    Some((Arc::from(name), value.to_owned()))
                })
                .collect()
        })
        .unwrap_or_default()
}
