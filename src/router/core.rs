//! Router core - linear, declaration-ordered route matching.

use crate::operation::Operation;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of url/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated `(name, raw value)` pairs for the hot path.
///
/// Names are `Arc<str>` because they come from the compiled route table and
/// are cloned per request; values are per-request data.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

#[allow(clippy::expect_used)]
static PARAM_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^:([A-Za-z_][A-Za-z0-9_]*)$").expect("param token regex should be valid")
});

/// Result of matching a request path to an operation.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub operation: Arc<Operation>,
    /// Position of the operation in declaration order.
    pub index: usize,
    /// Url params in pattern order, percent-decoded.
    pub url_params: ParamVec,
}

impl RouteMatch {
    /// Get a url parameter by name.
    #[inline]
    #[must_use]
    pub fn url_param(&self, name: &str) -> Option<&str> {
        self.url_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    method: Method,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    operation: Arc<Operation>,
}

/// Matches `(method, path)` against the declared operations.
///
/// Routes are scanned in declaration order and the first one whose method and
/// pattern both match wins. Overlapping patterns are not ranked by
/// specificity, so the order operations are registered in is significant.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    /// Compile every operation's url pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex error for a pattern that cannot be compiled.
    pub fn new(operations: &[Arc<Operation>]) -> Result<Self, regex::Error> {
        let mut routes = Vec::with_capacity(operations.len());
        for op in operations {
            let (regex, param_names) = Self::path_to_regex(&op.url_pattern)?;
            routes.push(CompiledRoute {
                method: op.method.clone(),
                regex,
                param_names,
                operation: Arc::clone(op),
            });
        }

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method, r.operation.url_pattern))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Ok(Self { routes })
    }

    /// Number of compiled routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first operation matching `method` and `path`.
    ///
    /// `path` must not include the query string.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        for (index, route) in self.routes.iter().enumerate() {
            if route.method != *method {
                continue;
            }
            let Some(caps) = route.regex.captures(path) else {
                continue;
            };
            let mut url_params = ParamVec::new();
            for (i, name) in route.param_names.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    let value = urlencoding::decode(m.as_str())
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| m.as_str().to_owned());
                    url_params.push((Arc::clone(name), value));
                }
            }
            debug!(
                method = %method,
                path = %path,
                operation_id = %route.operation.operation_id,
                url_params = ?url_params,
                "Route matched"
            );
            return Some(RouteMatch {
                operation: Arc::clone(&route.operation),
                index,
                url_params,
            });
        }
        debug!(method = %method, path = %path, "No route matched");
        None
    }

    /// Convert a `:name` pattern to an anchored regex plus its ordered param names.
    ///
    /// `/users/:id/posts/:post` becomes `^/users/([^/]+)/posts/([^/]+)$`.
    ///
    /// # Errors
    ///
    /// Propagates regex compilation failures.
    pub fn path_to_regex(pattern: &str) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
        if pattern == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut re = String::with_capacity(pattern.len() + 8);
        re.push('^');
        let mut names = Vec::new();
        for (i, segment) in pattern.split('/').enumerate() {
            if i == 0 && segment.is_empty() {
                continue;
            }
            // Empty segments stay literal so `/users/` never matches `/users`.
            if let Some(caps) = PARAM_TOKEN.captures(segment) {
                re.push_str("/([^/]+)");
                names.push(Arc::from(&caps[1]));
            } else {
                re.push('/');
                re.push_str(&regex::escape(segment));
            }
        }
        re.push('$');
        Ok((Regex::new(&re)?, names))
    }
}

/// The `:name` tokens of a pattern, in order.
#[must_use]
pub fn pattern_tokens(pattern: &str) -> Vec<&str> {
    pattern
        .split('/')
        .filter_map(|seg| PARAM_TOKEN.captures(seg).and_then(|c| c.get(1)))
        .map(|m| m.as_str())
        .collect()
}

/// Rewrite `:name` segments to OpenAPI `{name}` syntax.
#[must_use]
pub fn to_openapi_path(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|seg| match PARAM_TOKEN.captures(seg).and_then(|c| c.get(1)) {
            Some(name) => format!("{{{}}}", name.as_str()),
            None => seg.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
