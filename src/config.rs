//! # Service Configuration
//!
//! Everything the dispatcher and the specification synthesizer read: the
//! file-loadable [`ServiceSettings`], the build identity, the declared
//! operations with their handlers, the two middleware pools and any extra
//! named types.
//!
//! A [`ServiceConfig`] is assembled once through [`ServiceConfig::builder`],
//! checked as a whole, and never mutated afterwards. The dispatcher holds it
//! in an `Arc` and reads it concurrently without locks.
//!
//! ```rust
//! use opsrouter::config::ServiceConfig;
//! use opsrouter::dispatcher::HandlerResponse;
//! use opsrouter::operation::Operation;
//! use http::Method;
//! use serde_json::json;
//!
//! let config = ServiceConfig::builder()
//!     .title("Pets")
//!     .operation(Operation::new(Method::GET, "/pets", "listPets"))
//!     .handler("listPets", |_req, _ctx| Ok(HandlerResponse::json(json!([]))))
//!     .build()
//!     .unwrap();
//! assert_eq!(config.operations().len(), 1);
//! ```

use crate::dispatcher::{HandlerResponse, OperationHandler, RequestView};
use crate::context::Context;
use crate::error::{ErrorFactory, Failure};
use crate::middleware::{CorsPolicy, Middleware};
use crate::operation::{check_operation, Operation};
use crate::router::Router;
use crate::types::NamedType;
use crate::validator::{format_issues, ValidationIssue};
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// CORS allow-list. Empty disables CORS headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub origins: Vec<String>,
}

/// Api-version header policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiVersionSettings {
    pub header: String,
    /// Reject requests without the header before routing.
    pub required: bool,
}

impl Default for ApiVersionSettings {
    fn default() -> Self {
        Self {
            header: "x-api-version".into(),
            required: false,
        }
    }
}

/// Where credentials are looked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub api_key_header: String,
    pub cookie_name: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            api_key_header: "x-api-key".into(),
            cookie_name: "session".into(),
        }
    }
}

/// The static, file-loadable part of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    pub cors: CorsSettings,
    pub api_version: ApiVersionSettings,
    pub auth: AuthSettings,
    pub max_body_bytes: usize,
    /// Directory served under `/docs/assets/`.
    pub docs_assets_dir: Option<PathBuf>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            title: "API".into(),
            description: None,
            version: "0.0.0".into(),
            cors: CorsSettings::default(),
            api_version: ApiVersionSettings::default(),
            auth: AuthSettings::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            docs_assets_dir: None,
        }
    }
}

impl ServiceSettings {
    /// Load settings from a YAML, JSON or TOML file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, unknown extensions and parse errors.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let settings = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            other => anyhow::bail!("unsupported settings format '{other}' for {}", path.display()),
        };
        Ok(settings)
    }
}

/// Build identity echoed on every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub commit: String,
    pub timestamp: String,
}

impl BuildInfo {
    /// Read `OPSR_BUILD_COMMIT` and `OPSR_BUILD_TIMESTAMP`, blank when unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            commit: std::env::var("OPSR_BUILD_COMMIT").unwrap_or_default(),
            timestamp: std::env::var("OPSR_BUILD_TIMESTAMP").unwrap_or_default(),
        }
    }
}

/// Every problem found while building a [`ServiceConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid service configuration ({} issues):\n{}",
            self.issues.len(),
            format_issues(&self.issues)
        )
    }
}

impl std::error::Error for ConfigError {}

/// An operation with its handler and middleware resolved against the pools.
#[derive(Clone)]
pub struct ResolvedOperation {
    pub operation: Arc<Operation>,
    pub handler: Arc<dyn OperationHandler>,
    /// Pre-body middleware the operation depends on, in pool order.
    pub pre: Vec<Arc<dyn Middleware>>,
    /// Post-body middleware the operation depends on, in pool order.
    pub post: Vec<Arc<dyn Middleware>>,
    pub errors: ErrorFactory,
}

impl ResolvedOperation {
    /// Resolved middleware, pre-body first.
    pub fn middleware(&self) -> impl Iterator<Item = &Arc<dyn Middleware>> {
        self.pre.iter().chain(self.post.iter())
    }

    #[must_use]
    pub fn uses_auth_api_key(&self) -> bool {
        self.middleware().any(|m| m.uses_auth_api_key())
    }

    #[must_use]
    pub fn uses_auth_cookie(&self) -> bool {
        self.middleware().any(|m| m.uses_auth_cookie())
    }
}

impl fmt::Debug for ResolvedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOperation")
            .field("operation_id", &self.operation.operation_id)
            .field("pre", &self.pre.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("post", &self.post.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Immutable service model shared by the dispatcher and the synthesizer.
pub struct ServiceConfig {
    settings: ServiceSettings,
    build_info: BuildInfo,
    resolved: Vec<ResolvedOperation>,
    pre_body: Vec<Arc<dyn Middleware>>,
    post_body: Vec<Arc<dyn Middleware>>,
    types: Vec<Arc<NamedType>>,
    router: Router,
    cors: CorsPolicy,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("settings", &self.settings)
            .field("build_info", &self.build_info)
            .field("operations", &self.resolved)
            .finish_non_exhaustive()
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    #[must_use]
    pub fn build_info(&self) -> &BuildInfo {
        &self.build_info
    }

    /// Operations in declaration order, with their resolved middleware.
    #[must_use]
    pub fn operations(&self) -> &[ResolvedOperation] {
        &self.resolved
    }

    #[must_use]
    pub fn pre_body(&self) -> &[Arc<dyn Middleware>] {
        &self.pre_body
    }

    #[must_use]
    pub fn post_body(&self) -> &[Arc<dyn Middleware>] {
        &self.post_body
    }

    /// Named types registered directly, beyond those operations reference.
    #[must_use]
    pub fn types(&self) -> &[Arc<NamedType>] {
        &self.types
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }
}

/// Collects the pieces of a [`ServiceConfig`]; [`build`](Self::build) checks them.
#[derive(Default)]
pub struct ServiceConfigBuilder {
    settings: ServiceSettings,
    build_info: BuildInfo,
    operations: Vec<Operation>,
    handlers: Vec<(String, Arc<dyn OperationHandler>)>,
    pre_body: Vec<Arc<dyn Middleware>>,
    post_body: Vec<Arc<dyn Middleware>>,
    types: Vec<Arc<NamedType>>,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.settings.title = title.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.settings.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.settings.version = version.into();
        self
    }

    #[must_use]
    pub fn cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.cors.origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Require `header` on every non-reserved request.
    #[must_use]
    pub fn require_api_version(mut self, header: impl Into<String>) -> Self {
        self.settings.api_version = ApiVersionSettings {
            header: header.into(),
            required: true,
        };
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.settings.max_body_bytes = limit;
        self
    }

    #[must_use]
    pub fn build_info(mut self, info: BuildInfo) -> Self {
        self.build_info = info;
        self
    }

    /// Declare an operation. Routing follows declaration order.
    #[must_use]
    pub fn operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Bind a closure handler to an operation id.
    #[must_use]
    pub fn handler<F>(self, operation_id: &str, f: F) -> Self
    where
        F: Fn(&RequestView, &mut Context) -> Result<HandlerResponse, Failure> + Send + Sync + 'static,
    {
        self.handler_impl(operation_id, f)
    }

    /// Bind any [`OperationHandler`] to an operation id.
    #[must_use]
    pub fn handler_impl<H: OperationHandler + 'static>(mut self, operation_id: &str, h: H) -> Self {
        self.handlers.push((operation_id.to_owned(), Arc::new(h)));
        self
    }

    #[must_use]
    pub fn pre_body<M: Middleware + 'static>(mut self, mw: M) -> Self {
        self.pre_body.push(Arc::new(mw));
        self
    }

    #[must_use]
    pub fn post_body<M: Middleware + 'static>(mut self, mw: M) -> Self {
        self.post_body.push(Arc::new(mw));
        self
    }

    #[must_use]
    pub fn named_type(mut self, ty: Arc<NamedType>) -> Self {
        self.types.push(ty);
        self
    }

    /// Check the whole model and freeze it.
    ///
    /// # Errors
    ///
    /// Returns every issue found, not just the first.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let mut issues = Vec::new();

        let cors = CorsPolicy::new(self.settings.cors.origins.clone()).unwrap_or_else(|e| {
            issues.push(ValidationIssue::new("settings.cors", "InvalidCors", e.to_string()));
            CorsPolicy::default()
        });

        let mut mw_names = HashSet::new();
        for mw in self.pre_body.iter().chain(self.post_body.iter()) {
            if !mw_names.insert(mw.name().to_owned()) {
                issues.push(ValidationIssue::new(
                    "middleware",
                    "DuplicateMiddleware",
                    format!("middleware '{}' is registered more than once", mw.name()),
                ));
            }
        }

        let mut handlers: HashMap<String, Arc<dyn OperationHandler>> = HashMap::new();
        for (id, h) in self.handlers {
            if handlers.insert(id.clone(), h).is_some() {
                issues.push(ValidationIssue::new(
                    &id,
                    "DuplicateHandler",
                    format!("operation '{id}' has more than one handler"),
                ));
            }
        }

        let mut op_ids = HashSet::new();
        let mut resolved = Vec::with_capacity(self.operations.len());
        for op in self.operations {
            issues.extend(check_operation(&op));
            let location = format!("{} {}", op.method, op.url_pattern);

            if !op_ids.insert(op.operation_id.clone()) {
                issues.push(ValidationIssue::new(
                    &location,
                    "DuplicateOperationId",
                    format!("operationId '{}' is declared more than once", op.operation_id),
                ));
            }
            for dep in &op.middleware {
                if !mw_names.contains(dep) {
                    issues.push(ValidationIssue::new(
                        &location,
                        "UnknownMiddleware",
                        format!(
                            "operation '{}' depends on middleware '{dep}' which is in neither pool",
                            op.operation_id
                        ),
                    ));
                }
            }

            let Some(handler) = handlers.remove(&op.operation_id) else {
                issues.push(ValidationIssue::new(
                    &location,
                    "MissingHandler",
                    format!("operation '{}' has no handler", op.operation_id),
                ));
                continue;
            };

            let select = |pool: &[Arc<dyn Middleware>]| -> Vec<Arc<dyn Middleware>> {
                pool.iter()
                    .filter(|m| op.middleware.iter().any(|d| d == m.name()))
                    .map(Arc::clone)
                    .collect()
            };
            let pre = select(&self.pre_body);
            let post = select(&self.post_body);

            let mut catalogue = op.failures.clone();
            for mw in pre.iter().chain(post.iter()) {
                catalogue.extend(mw.failures().iter().map(|f| match &f.from_middleware {
                    Some(_) => f.clone(),
                    None => f.clone().from_middleware(mw.name()),
                }));
            }
            let errors = ErrorFactory::new(&op.operation_id, catalogue);

            resolved.push(ResolvedOperation {
                operation: Arc::new(op),
                handler,
                pre,
                post,
                errors,
            });
        }

        for id in handlers.keys() {
            issues.push(ValidationIssue::new(
                id,
                "OrphanHandler",
                format!("handler registered for unknown operation '{id}'"),
            ));
        }

        let ops: Vec<Arc<Operation>> = resolved.iter().map(|r| Arc::clone(&r.operation)).collect();
        let router = Router::new(&ops).unwrap_or_else(|e| {
            issues.push(ValidationIssue::new("router", "InvalidPattern", e.to_string()));
            Router::default()
        });

        if !issues.is_empty() {
            return Err(ConfigError { issues });
        }

        info!(
            title = %self.settings.title,
            operations = resolved.len(),
            pre_body = self.pre_body.len(),
            post_body = self.post_body.len(),
            "Service configuration built"
        );

        Ok(ServiceConfig {
            settings: self.settings,
            build_info: self.build_info,
            resolved,
            pre_body: self.pre_body,
            post_body: self.post_body,
            types: self.types,
            router,
            cors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use crate::operation::{FailureDefinition, ParamDecl};
    use http::Method;
    use serde_json::json;
    use std::io::Write;

    fn ok(_req: &RequestView, _ctx: &mut Context) -> Result<HandlerResponse, Failure> {
        Ok(HandlerResponse::empty())
    }

    fn passthrough(name: &str) -> FnMiddleware {
        FnMiddleware::new(name, |_req, ctx, _op, next| next.run(ctx))
    }

    fn kinds(err: ConfigError) -> Vec<String> {
        err.issues.into_iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_reports_every_issue() {
        let err = ServiceConfig::builder()
            .operation(Operation::new(Method::GET, "/a/:id", "a"))
            .operation(Operation::new(Method::GET, "/b", "a").uses("ghost"))
            .operation(Operation::new(Method::GET, "/c", "c"))
            .handler("a", ok)
            .handler("zzz", ok)
            .pre_body(passthrough("dup"))
            .post_body(passthrough("dup"))
            .build()
            .unwrap_err();
        let k = kinds(err);
        for expected in [
            "DuplicateMiddleware",
            "UrlParamMismatch",
            "DuplicateOperationId",
            "UnknownMiddleware",
            "MissingHandler",
            "OrphanHandler",
        ] {
            assert!(k.iter().any(|x| x == expected), "missing {expected} in {k:?}");
        }
    }

    #[test]
    fn test_middleware_resolved_in_pool_order() {
        let config = ServiceConfig::builder()
            .operation(
                Operation::new(Method::GET, "/x", "x")
                    .uses("m2")
                    .uses("m1")
                    .uses("m4"),
            )
            .handler("x", ok)
            .pre_body(passthrough("m1"))
            .pre_body(passthrough("m2"))
            .post_body(passthrough("m3"))
            .post_body(passthrough("m4"))
            .build()
            .unwrap();
        let r = &config.operations()[0];
        let pre: Vec<_> = r.pre.iter().map(|m| m.name()).collect();
        let post: Vec<_> = r.post.iter().map(|m| m.name()).collect();
        assert_eq!(pre, vec!["m1", "m2"]);
        assert_eq!(post, vec!["m4"]);
    }

    #[test]
    fn test_catalogue_includes_middleware_failures() {
        let mw = passthrough("limits").failure(FailureDefinition::new("throttled", 429, "Slow down"));
        let config = ServiceConfig::builder()
            .operation(
                Operation::new(Method::GET, "/t/:id", "t")
                    .url_param(ParamDecl::required("id", Arc::new(NamedType::number("Id"))))
                    .uses("limits"),
            )
            .handler("t", ok)
            .pre_body(mw)
            .build()
            .unwrap();
        let def = config.operations()[0].errors.lookup("throttled").unwrap();
        assert_eq!(def.from_middleware.as_deref(), Some("limits"));
    }

    #[test]
    fn test_invalid_cors_is_an_issue() {
        let err = ServiceConfig::builder().cors_origins(["*"]).build().unwrap_err();
        assert_eq!(kinds(err), vec!["InvalidCors"]);
    }

    #[test]
    fn test_settings_load_formats() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("svc.yaml");
        std::fs::File::create(&yaml)
            .unwrap()
            .write_all(b"title: Pets\ncors:\n  origins: [\"https://example.com\"]\napi_version:\n  required: true\n")
            .unwrap();
        let s = ServiceSettings::load(&yaml).unwrap();
        assert_eq!(s.title, "Pets");
        assert!(s.api_version.required);
        assert_eq!(s.api_version.header, "x-api-version");
        assert_eq!(s.max_body_bytes, DEFAULT_MAX_BODY_BYTES);

        let toml_path = dir.path().join("svc.toml");
        std::fs::write(&toml_path, "title = \"Toml\"\nmax_body_bytes = 10\n[auth]\napi_key_header = \"x-key\"\n").unwrap();
        let s = ServiceSettings::load(&toml_path).unwrap();
        assert_eq!(s.max_body_bytes, 10);
        assert_eq!(s.auth.api_key_header, "x-key");
        assert_eq!(s.auth.cookie_name, "session");

        let json_path = dir.path().join("svc.json");
        std::fs::write(&json_path, json!({"version": "2.1.0"}).to_string()).unwrap();
        assert_eq!(ServiceSettings::load(&json_path).unwrap().version, "2.1.0");

        let other = dir.path().join("svc.ini");
        std::fs::write(&other, "x").unwrap();
        assert!(ServiceSettings::load(&other).is_err());
    }
}
