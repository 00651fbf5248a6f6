use crate::types::NamedType;
use http::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The only verbs an operation may declare.
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::DELETE,
    Method::GET,
    Method::PATCH,
    Method::POST,
    Method::PUT,
];

/// Where a declared parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Url,
    Header,
    Query,
}

impl ParamLocation {
    /// OpenAPI `in` value.
    #[must_use]
    pub fn openapi_in(self) -> &'static str {
        match self {
            ParamLocation::Url => "path",
            ParamLocation::Header => "header",
            ParamLocation::Query => "query",
        }
    }
}

impl std::fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamLocation::Url => write!(f, "url"),
            ParamLocation::Header => write!(f, "header"),
            ParamLocation::Query => write!(f, "query"),
        }
    }
}

/// One declared header, query or url parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub named_type: Arc<NamedType>,
    pub required: bool,
    pub deprecated: bool,
    pub description: Option<String>,
}

impl ParamDecl {
    pub fn required(name: impl Into<String>, named_type: Arc<NamedType>) -> Self {
        Self {
            name: name.into(),
            named_type,
            required: true,
            deprecated: false,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, named_type: Arc<NamedType>) -> Self {
        Self {
            required: false,
            ..Self::required(name, named_type)
        }
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A header the operation promises to set on success.
#[derive(Debug, Clone)]
pub struct ResponseHeaderDecl {
    pub name: String,
    pub named_type: Arc<NamedType>,
    pub description: Option<String>,
}

impl ResponseHeaderDecl {
    pub fn new(name: impl Into<String>, named_type: Arc<NamedType>) -> Self {
        Self {
            name: name.into(),
            named_type,
            description: None,
        }
    }
}

/// A declared `{type, code, summary}` triple an operation or middleware may raise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDefinition {
    #[serde(rename = "type")]
    pub failure_type: String,
    pub code: u16,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_middleware: Option<String>,
}

impl FailureDefinition {
    pub fn new(failure_type: impl Into<String>, code: u16, summary: impl Into<String>) -> Self {
        Self {
            failure_type: failure_type.into(),
            code,
            summary: summary.into(),
            from_middleware: None,
        }
    }

    /// Tag the definition with the middleware that declares it.
    #[must_use]
    pub fn from_middleware(mut self, name: impl Into<String>) -> Self {
        self.from_middleware = Some(name.into());
        self
    }
}

/// One declared (method, url pattern) endpoint.
///
/// Built with chained setters, then handed to
/// [`ServiceConfigBuilder::operation`](crate::config::ServiceConfigBuilder::operation)
/// which checks it against the rest of the model.
#[derive(Debug, Clone)]
pub struct Operation {
    pub operation_id: String,
    pub method: Method,
    /// Path with `:name` segments, e.g. `/pets/:id`.
    pub url_pattern: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Ordered, always required.
    pub url_params: Vec<ParamDecl>,
    pub header_params: Vec<ParamDecl>,
    pub query_params: Vec<ParamDecl>,
    pub request_body: Option<Arc<NamedType>>,
    pub response_body: Option<Arc<NamedType>>,
    pub response_headers: Vec<ResponseHeaderDecl>,
    pub success_code: u16,
    pub failures: Vec<FailureDefinition>,
    /// Middleware names this operation depends on, matched against both pools.
    pub middleware: Vec<String>,
    pub tags: Vec<String>,
    pub flags: Vec<String>,
    pub api_version: Option<String>,
    pub deprecated: bool,
}

impl Operation {
    pub fn new(method: Method, url_pattern: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            method,
            url_pattern: url_pattern.into(),
            display_name: None,
            description: None,
            url_params: Vec::new(),
            header_params: Vec::new(),
            query_params: Vec::new(),
            request_body: None,
            response_body: None,
            response_headers: Vec::new(),
            success_code: 200,
            failures: Vec::new(),
            middleware: Vec::new(),
            tags: Vec::new(),
            flags: Vec::new(),
            api_version: None,
            deprecated: false,
        }
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Declare the next url parameter. Url params are always required, so the
    /// declaration's own flag is overridden.
    #[must_use]
    pub fn url_param(mut self, mut param: ParamDecl) -> Self {
        param.required = true;
        self.url_params.push(param);
        self
    }

    #[must_use]
    pub fn header_param(mut self, param: ParamDecl) -> Self {
        self.header_params.push(param);
        self
    }

    #[must_use]
    pub fn query_param(mut self, param: ParamDecl) -> Self {
        self.query_params.push(param);
        self
    }

    #[must_use]
    pub fn request_body(mut self, named_type: Arc<NamedType>) -> Self {
        self.request_body = Some(named_type);
        self
    }

    #[must_use]
    pub fn response_body(mut self, named_type: Arc<NamedType>) -> Self {
        self.response_body = Some(named_type);
        self
    }

    #[must_use]
    pub fn response_header(mut self, header: ResponseHeaderDecl) -> Self {
        self.response_headers.push(header);
        self
    }

    #[must_use]
    pub fn success_code(mut self, code: u16) -> Self {
        self.success_code = code;
        self
    }

    #[must_use]
    pub fn failure(mut self, failure: FailureDefinition) -> Self {
        self.failures.push(failure);
        self
    }

    #[must_use]
    pub fn uses(mut self, middleware: impl Into<String>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Name used to order operations in the generated specification.
    #[must_use]
    pub fn sort_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.operation_id)
    }

    /// Declared params for one location, in declaration order.
    #[must_use]
    pub fn params(&self, location: ParamLocation) -> &[ParamDecl] {
        match location {
            ParamLocation::Url => &self.url_params,
            ParamLocation::Header => &self.header_params,
            ParamLocation::Query => &self.query_params,
        }
    }

    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}
