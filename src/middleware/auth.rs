use super::pipeline::Next;
use super::Middleware;
use crate::config::AuthSettings;
use crate::context::Context;
use crate::dispatcher::{HandlerResponse, RequestView};
use crate::error::Failure;
use crate::operation::{FailureDefinition, Operation};
use std::sync::Arc;
use tracing::{debug, warn};

pub const AUTH_NOT_IMPLEMENTED: &str = "authNotImplemented";
pub const API_KEY_MISSING: &str = "apiKeyMissing";
pub const API_KEY_INVALID: &str = "apiKeyInvalid";
pub const SESSION_COOKIE_MISSING: &str = "sessionCookieMissing";
pub const SESSION_COOKIE_INVALID: &str = "sessionCookieInvalid";

/// Maps a presented credential to a principal, `None` when rejected.
pub type CredentialValidator = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// How a request was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    ApiKey,
    Cookie,
}

/// Placed in the [`Context`] by the auth middleware on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub scheme: AuthScheme,
    pub principal: String,
}

/// Checks an api key header.
///
/// Without a validator every request fails with 501 `authNotImplemented`.
pub struct ApiKeyMiddleware {
    name: String,
    header: String,
    validator: Option<CredentialValidator>,
    failures: Vec<FailureDefinition>,
}

impl ApiKeyMiddleware {
    pub fn new(header: impl Into<String>) -> Self {
        let name = "apiKey".to_owned();
        Self {
            failures: vec![
                FailureDefinition::new(API_KEY_MISSING, 401, "API key missing").from_middleware(&name),
                FailureDefinition::new(API_KEY_INVALID, 401, "API key not valid").from_middleware(&name),
                FailureDefinition::new(AUTH_NOT_IMPLEMENTED, 501, "Authentication not implemented")
                    .from_middleware(&name),
            ],
            name,
            header: header.into(),
            validator: None,
        }
    }

    #[must_use]
    pub fn from_settings(auth: &AuthSettings) -> Self {
        Self::new(auth.api_key_header.clone())
    }

    /// Rename the middleware (the name operations list it under).
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        for f in &mut self.failures {
            f.from_middleware = Some(self.name.clone());
        }
        self
    }

    #[must_use]
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.header
    }
}

impl Middleware for ApiKeyMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn failures(&self) -> &[FailureDefinition] {
        &self.failures
    }

    fn uses_auth_api_key(&self) -> bool {
        true
    }

    fn handle(
        &self,
        req: &RequestView,
        ctx: &mut Context,
        op: &Operation,
        next: &mut Next<'_>,
    ) -> Result<HandlerResponse, Failure> {
        let Some(validator) = &self.validator else {
            warn!(operation_id = %op.operation_id, "No api key validator configured");
            return Err(ctx.error(AUTH_NOT_IMPLEMENTED).into());
        };
        let Some(key) = req.raw_header(&self.header).filter(|k| !k.is_empty()) else {
            return Err(ctx
                .error(API_KEY_MISSING)
                .with_detail(format!("header '{}' is required", self.header))
                .into());
        };
        let Some(principal) = validator(key) else {
            return Err(ctx.error(API_KEY_INVALID).into());
        };
        debug!(principal = %principal, "Api key accepted");
        ctx.insert(Authenticated {
            scheme: AuthScheme::ApiKey,
            principal,
        });
        next.run(ctx)
    }
}

/// Checks a session cookie.
///
/// Without a validator every request fails with 501 `authNotImplemented`.
pub struct CookieAuthMiddleware {
    name: String,
    cookie: String,
    validator: Option<CredentialValidator>,
    failures: Vec<FailureDefinition>,
}

impl CookieAuthMiddleware {
    pub fn new(cookie: impl Into<String>) -> Self {
        let name = "cookieAuth".to_owned();
        Self {
            failures: vec![
                FailureDefinition::new(SESSION_COOKIE_MISSING, 401, "Session cookie missing")
                    .from_middleware(&name),
                FailureDefinition::new(SESSION_COOKIE_INVALID, 401, "Session cookie not valid")
                    .from_middleware(&name),
                FailureDefinition::new(AUTH_NOT_IMPLEMENTED, 501, "Authentication not implemented")
                    .from_middleware(&name),
            ],
            name,
            cookie: cookie.into(),
            validator: None,
        }
    }

    #[must_use]
    pub fn from_settings(auth: &AuthSettings) -> Self {
        Self::new(auth.cookie_name.clone())
    }

    /// Rename the middleware so a second cookie scheme can sit in the same pool.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        for f in &mut self.failures {
            f.from_middleware = Some(self.name.clone());
        }
        self
    }

    #[must_use]
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie
    }
}

impl Middleware for CookieAuthMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn failures(&self) -> &[FailureDefinition] {
        &self.failures
    }

    fn uses_auth_cookie(&self) -> bool {
        true
    }

    fn handle(
        &self,
        req: &RequestView,
        ctx: &mut Context,
        op: &Operation,
        next: &mut Next<'_>,
    ) -> Result<HandlerResponse, Failure> {
        let Some(validator) = &self.validator else {
            warn!(operation_id = %op.operation_id, "No session cookie validator configured");
            return Err(ctx.error(AUTH_NOT_IMPLEMENTED).into());
        };
        let Some(session) = req.cookie(&self.cookie).filter(|c| !c.is_empty()) else {
            return Err(ctx.error(SESSION_COOKIE_MISSING).into());
        };
        let Some(principal) = validator(session) else {
            return Err(ctx.error(SESSION_COOKIE_INVALID).into());
        };
        ctx.insert(Authenticated {
            scheme: AuthScheme::Cookie,
            principal,
        });
        next.run(ctx)
    }
}
