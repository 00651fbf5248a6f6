use super::pipeline::Next;
use crate::context::Context;
use crate::dispatcher::{HandlerResponse, RequestView};
use crate::error::Failure;
use crate::operation::{FailureDefinition, Operation};

/// A named, reusable request interceptor.
///
/// Middleware live in one of two pools (pre-body or post-body) on the service
/// configuration and only run for operations that list their name. Each call
/// to [`handle`](Middleware::handle) gets a one-shot [`Next`] that runs the
/// rest of the chain; returning without calling it short-circuits.
pub trait Middleware: Send + Sync {
    /// The name operations refer to this middleware by.
    fn name(&self) -> &str;

    /// Failures this middleware may raise through the context's error factory.
    fn failures(&self) -> &[FailureDefinition] {
        &[]
    }

    fn uses_auth_cookie(&self) -> bool {
        false
    }

    fn uses_auth_api_key(&self) -> bool {
        false
    }

    /// # Errors
    ///
    /// A declared failure, or a fault (including a second `next.run`).
    fn handle(
        &self,
        req: &RequestView,
        ctx: &mut Context,
        op: &Operation,
        next: &mut Next<'_>,
    ) -> Result<HandlerResponse, Failure>;
}

type MiddlewareFn = dyn Fn(&RequestView, &mut Context, &Operation, &mut Next<'_>) -> Result<HandlerResponse, Failure>
    + Send
    + Sync;

/// Middleware built from a closure.
///
/// ```rust
/// use opsrouter::middleware::FnMiddleware;
///
/// let audit = FnMiddleware::new("audit", |req, ctx, _op, next| {
///     ctx.set("audit", "path", req.path().into());
///     next.run(ctx)
/// });
/// ```
pub struct FnMiddleware {
    name: String,
    failures: Vec<FailureDefinition>,
    auth_cookie: bool,
    auth_api_key: bool,
    f: Box<MiddlewareFn>,
}

impl FnMiddleware {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RequestView, &mut Context, &Operation, &mut Next<'_>) -> Result<HandlerResponse, Failure>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            failures: Vec::new(),
            auth_cookie: false,
            auth_api_key: false,
            f: Box::new(f),
        }
    }

    #[must_use]
    pub fn failure(mut self, def: FailureDefinition) -> Self {
        let def = def.from_middleware(self.name.clone());
        self.failures.push(def);
        self
    }

    #[must_use]
    pub fn uses_auth_cookie(mut self) -> Self {
        self.auth_cookie = true;
        self
    }

    #[must_use]
    pub fn uses_auth_api_key(mut self) -> Self {
        self.auth_api_key = true;
        self
    }
}

impl Middleware for FnMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn failures(&self) -> &[FailureDefinition] {
        &self.failures
    }

    fn uses_auth_cookie(&self) -> bool {
        self.auth_cookie
    }

    fn uses_auth_api_key(&self) -> bool {
        self.auth_api_key
    }

    fn handle(
        &self,
        req: &RequestView,
        ctx: &mut Context,
        op: &Operation,
        next: &mut Next<'_>,
    ) -> Result<HandlerResponse, Failure> {
        (self.f)(req, ctx, op, next)
    }
}
