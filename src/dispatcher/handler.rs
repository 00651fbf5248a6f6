use crate::context::{Context, RequestId};
use crate::error::Failure;
use crate::extract::{RequestValues, ValueStore};
use crate::server::HeaderVec;
use http::Method;
use serde_json::Value;
use std::sync::Arc;

/// What a handler (or a short-circuiting middleware) returns.
///
/// `status` defaults to the operation's success code. A `None` body is sent
/// empty; anything else is JSON-encoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerResponse {
    pub status: Option<u16>,
    pub body: Option<Value>,
    /// Rendered with [`header_value_string`](crate::extract::header_value_string).
    pub headers: Vec<(String, Value)>,
}

impl HandlerResponse {
    /// JSON body, default status.
    #[must_use]
    pub fn json(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    /// Empty body, default status.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// The business logic bound to one operation id.
pub trait OperationHandler: Send + Sync {
    /// # Errors
    ///
    /// A declared [`HttpError`](crate::error::HttpError) or a fault.
    fn handle(&self, req: &RequestView, ctx: &mut Context) -> Result<HandlerResponse, Failure>;
}

impl<F> OperationHandler for F
where
    F: Fn(&RequestView, &mut Context) -> Result<HandlerResponse, Failure> + Send + Sync,
{
    fn handle(&self, req: &RequestView, ctx: &mut Context) -> Result<HandlerResponse, Failure> {
        self(req, ctx)
    }
}

#[derive(Debug)]
struct ViewParts {
    request_id: RequestId,
    method: Method,
    path: String,
    headers: HeaderVec,
    cookies: HeaderVec,
    values: RequestValues,
}

/// Read-only view of the request handed to middleware and handlers.
///
/// Cheap to clone. Pre-body middleware see `body() == None`; post-body
/// middleware and the handler see `Some`, which is `Value::Null` when the
/// operation declares no body.
#[derive(Debug, Clone)]
pub struct RequestView {
    parts: Arc<ViewParts>,
    body: Option<Arc<Value>>,
}

impl RequestView {
    pub fn new(
        request_id: RequestId,
        method: Method,
        path: impl Into<String>,
        headers: HeaderVec,
        cookies: HeaderVec,
        values: RequestValues,
    ) -> Self {
        Self {
            parts: Arc::new(ViewParts {
                request_id,
                method,
                path: path.into(),
                headers,
                cookies,
                values,
            }),
            body: None,
        }
    }

    /// Same request, with the parsed body attached.
    #[must_use]
    pub fn with_body(&self, body: Value) -> Self {
        Self {
            parts: Arc::clone(&self.parts),
            body: Some(Arc::new(body)),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.parts.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.parts.path
    }

    /// Raw header, declared or not (case-insensitive).
    #[must_use]
    pub fn raw_header(&self, name: &str) -> Option<&str> {
        self.parts
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.parts
            .cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn values(&self) -> &RequestValues {
        &self.parts.values
    }

    #[must_use]
    pub fn url(&self) -> &ValueStore {
        &self.parts.values.url
    }

    #[must_use]
    pub fn headers(&self) -> &ValueStore {
        &self.parts.values.headers
    }

    #[must_use]
    pub fn query(&self) -> &ValueStore {
        &self.parts.values.query
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_deref()
    }
}
