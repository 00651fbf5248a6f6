//! # Error Model
//!
//! Two result channels share one recovery boundary (the dispatcher):
//!
//! - [`HttpError`] is a declared, client-facing failure. It is built either
//!   directly or through an [`ErrorFactory`] that looks a failure `type` up in
//!   the operation's catalogue and then in its middleware's catalogues.
//! - [`Fault`] is a programming or configuration defect. Its message is logged
//!   but the client only ever sees a generic 500.
//!
//! [`Failure`] is what handlers and middleware return in their `Err` arm.
//!
//! ## Wire format
//!
//! Every `HttpError` is rendered as `text/plain`:
//!
//! ```text
//! parameterMissing 400 Required parameter missing
//! {"detail":"header 'x-api-version' is required"}
//! ```
//!
//! The second line is present only when there is a detail or properties, and
//! [`HttpError::from_wire`] reverses it.

use crate::operation::FailureDefinition;
use crate::server::{status_reason, Response, CONTENT_TYPE_TEXT};
use crate::validator::ValidationIssue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Failure types raised by the router itself.
pub mod codes {
    pub const PARAMETER_MISSING: &str = "parameterMissing";
    pub const PARAMETER_NOT_NUMBER: &str = "parameterNotNumber";
    pub const PARAMETER_NOT_JSON: &str = "parameterNotJson";
    pub const PARAMETER_INVALID: &str = "parameterInvalid";
    pub const REQUEST_BODY_MISSING: &str = "requestBodyMissing";
    pub const REQUEST_BODY_NOT_JSON: &str = "requestBodyNotJson";
    pub const REQUEST_BODY_INVALID: &str = "requestBodyInvalid";
    pub const REQUEST_BODY_TOO_LARGE: &str = "requestBodyTooLarge";
    pub const API_VERSION_MISSING: &str = "apiVersionMissing";
    pub const RESOURCE_NOT_FOUND: &str = "resourceNotFound";
    pub const UNEXPECTED_ERROR: &str = "unexpectedError";
    pub const INTERNAL_ERROR: &str = "internalError";
}

/// A structured, client-facing HTTP failure.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    pub code: u16,
    pub error_type: String,
    pub summary: String,
    pub detail: Option<String>,
    pub properties: Option<Map<String, Value>>,
    /// Sent as response headers, not part of the wire body.
    pub additional_headers: Vec<(String, String)>,
}

#[derive(Serialize, Deserialize)]
struct WireDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<Map<String, Value>>,
}

/// A wire body that could not be parsed back into an [`HttpError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError(String);

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed error body: {}", self.0)
    }
}

impl std::error::Error for WireError {}

impl HttpError {
    pub fn new(code: u16, error_type: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code,
            error_type: error_type.into(),
            summary: summary.into(),
            detail: None,
            properties: None,
            additional_headers: Vec::new(),
        }
    }

    /// Instantiate a catalogue entry.
    #[must_use]
    pub fn from_definition(def: &FailureDefinition) -> Self {
        Self::new(def.code, def.failure_type.clone(), def.summary.clone())
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }

    /// Attach validator output under the `issues` property.
    #[must_use]
    pub fn with_issues(self, issues: &[ValidationIssue]) -> Self {
        let list = serde_json::to_value(issues).unwrap_or(Value::Array(Vec::new()));
        self.with_property("issues", list)
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404, codes::RESOURCE_NOT_FOUND, "resource not found")
    }

    /// The only shape a [`Fault`] is ever shown to a client as.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(500, codes::INTERNAL_ERROR, "Internal server error")
    }

    /// Collapsed form of a failure type no catalogue declares.
    #[must_use]
    pub fn unexpected(failure_type: &str) -> Self {
        Self::new(500, codes::UNEXPECTED_ERROR, "Unexpected error")
            .with_detail(format!("undeclared failure type '{failure_type}'"))
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code)
    }

    /// Render the wire body.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let summary = self.summary.replace(['\r', '\n'], " ");
        let mut out = format!("{} {} {}", self.error_type, self.code, summary);
        if self.detail.is_some() || self.properties.is_some() {
            let extra = WireDetail {
                detail: self.detail.clone(),
                properties: self.properties.clone(),
            };
            if let Ok(json) = serde_json::to_string(&extra) {
                out.push('\n');
                out.push_str(&json);
            }
        }
        out
    }

    /// Parse a wire body produced by [`HttpError::to_wire`].
    ///
    /// # Errors
    ///
    /// Fails when the first line is not `<type> <status> <summary>` or the
    /// second line is not the detail object.
    pub fn from_wire(text: &str) -> Result<Self, WireError> {
        let (head, tail) = match text.split_once('\n') {
            Some((h, t)) => (h, Some(t)),
            None => (text, None),
        };
        let mut parts = head.splitn(3, ' ');
        let error_type = parts
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| WireError("missing error type".into()))?;
        let code = parts
            .next()
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| WireError("missing or invalid status".into()))?;
        let summary = parts.next().unwrap_or("");

        let mut err = Self::new(code, error_type, summary);
        if let Some(tail) = tail.filter(|t| !t.trim().is_empty()) {
            let extra: WireDetail =
                serde_json::from_str(tail).map_err(|e| WireError(e.to_string()))?;
            err.detail = extra.detail;
            err.properties = extra.properties;
        }
        Ok(err)
    }

    /// Reconstruct the error carried by a response.
    ///
    /// # Errors
    ///
    /// Fails when the body is not UTF-8 or not a wire error, or when its status
    /// disagrees with the response's.
    pub fn from_response(res: &Response) -> Result<Self, WireError> {
        let text = res
            .body_str()
            .ok_or_else(|| WireError("body is not UTF-8".into()))?;
        let err = Self::from_wire(text)?;
        if err.code != res.status {
            return Err(WireError(format!(
                "body status {} does not match response status {}",
                err.code, res.status
            )));
        }
        Ok(err)
    }

    /// Build the response: status, fixed content type, wire body, additional headers.
    #[must_use]
    pub fn to_response(&self) -> Response {
        let mut res = Response::with_body(self.code, CONTENT_TYPE_TEXT, self.to_wire().into_bytes());
        for (name, value) in &self.additional_headers {
            res.set_header(name, value.clone());
        }
        res
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({}): {}", self.code, status_reason(self.code), self.error_type, self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, " - {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

/// An unrecoverable defect: bad configuration, misuse of an accessor, a
/// second `next()` call. Always answered with a generic 500.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal fault: {}", self.message)
    }
}

impl std::error::Error for Fault {}

/// The error half of every handler and middleware result.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    Http(HttpError),
    Fault(Fault),
}

impl Failure {
    /// Status the client will see.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Failure::Http(e) => e.code,
            Failure::Fault(_) => 500,
        }
    }

    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Failure::Fault(_))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Http(e) => e.fmt(f),
            Failure::Fault(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Failure {}

impl From<HttpError> for Failure {
    fn from(e: HttpError) -> Self {
        Failure::Http(e)
    }
}

impl From<Fault> for Failure {
    fn from(e: Fault) -> Self {
        Failure::Fault(e)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<HttpError>() {
            Ok(http) => Failure::Http(http),
            Err(other) => Failure::Fault(Fault::new(format!("{other:#}"))),
        }
    }
}

/// Builds declared errors for one operation and its resolved middleware.
///
/// The catalogue is the operation's failures followed by each dependency
/// middleware's failures in pipeline order; the first entry with a matching
/// type wins.
#[derive(Debug, Clone, Default)]
pub struct ErrorFactory {
    operation_id: Arc<str>,
    catalogue: Arc<[FailureDefinition]>,
}

impl ErrorFactory {
    pub fn new(operation_id: &str, catalogue: Vec<FailureDefinition>) -> Self {
        Self {
            operation_id: Arc::from(operation_id),
            catalogue: catalogue.into(),
        }
    }

    #[must_use]
    pub fn lookup(&self, failure_type: &str) -> Option<&FailureDefinition> {
        self.catalogue.iter().find(|d| d.failure_type == failure_type)
    }

    /// Instantiate a declared failure, or the 500 `unexpectedError` shape
    /// naming the undeclared type.
    #[must_use]
    pub fn create(&self, failure_type: &str) -> HttpError {
        match self.lookup(failure_type) {
            Some(def) => HttpError::from_definition(def),
            None => {
                warn!(
                    operation_id = %self.operation_id,
                    failure_type = %failure_type,
                    "Undeclared failure type raised"
                );
                HttpError::unexpected(failure_type)
            }
        }
    }

    #[must_use]
    pub fn catalogue(&self) -> &[FailureDefinition] {
        &self.catalogue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_without_detail_is_one_line() {
        let e = HttpError::not_found();
        assert_eq!(e.to_wire(), "resourceNotFound 404 resource not found");
        assert_eq!(HttpError::from_wire(&e.to_wire()).unwrap(), e);
    }

    #[test]
    fn test_wire_with_detail_and_properties() {
        let e = HttpError::new(456, "quotaExceeded", "Quota exceeded for today")
            .with_detail("limit is 10")
            .with_property("limit", json!(10));
        let wire = e.to_wire();
        assert!(wire.starts_with("quotaExceeded 456 Quota exceeded for today\n{"));
        assert_eq!(HttpError::from_wire(&wire).unwrap(), e);
    }

    #[test]
    fn test_from_wire_rejects_garbage() {
        assert!(HttpError::from_wire("").is_err());
        assert!(HttpError::from_wire("oops notanumber x").is_err());
        assert!(HttpError::from_wire("t 400 s\nnot json").is_err());
    }

    #[test]
    fn test_factory_operation_before_middleware() {
        let factory = ErrorFactory::new(
            "getTest",
            vec![
                FailureDefinition::new("denied", 403, "Operation says no"),
                FailureDefinition::new("denied", 401, "Middleware says no").from_middleware("auth"),
                FailureDefinition::new("throttled", 429, "Slow down").from_middleware("limits"),
            ],
        );
        assert_eq!(factory.create("denied").code, 403);
        assert_eq!(factory.create("throttled").summary, "Slow down");
    }

    #[test]
    fn test_factory_unknown_type_collapses() {
        let factory = ErrorFactory::new("getTest", Vec::new());
        let e = factory.create("mystery");
        assert_eq!(e.code, 500);
        assert_eq!(e.error_type, codes::UNEXPECTED_ERROR);
        assert!(e.detail.unwrap().contains("mystery"));
    }

    #[test]
    fn test_anyhow_conversion() {
        let f: Failure = anyhow::anyhow!("disk on fire").into();
        assert!(f.is_fault());
        let f: Failure = anyhow::Error::new(HttpError::not_found()).into();
        assert_eq!(f.status(), 404);
    }

    #[test]
    fn test_to_response_merges_headers() {
        let res = HttpError::new(401, "apiKeyMissing", "API key missing")
            .with_header("www-authenticate", "ApiKey")
            .to_response();
        assert_eq!(res.status, 401);
        assert_eq!(res.header("content-type"), Some(CONTENT_TYPE_TEXT));
        assert_eq!(res.header("WWW-Authenticate"), Some("ApiKey"));
    }
}
