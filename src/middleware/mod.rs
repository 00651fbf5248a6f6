//! # Middleware Module
//!
//! Named interceptors composed into a two-phase onion around each handler.
//!
//! The service configuration holds two ordered pools. For every request both
//! pools are filtered down to the middleware the matched operation lists, in
//! pool order. Pre-body middleware run before the JSON body is read and never
//! see it; post-body middleware and the handler always do.
//!
//! Middleware talk to each other and to the handler only through the
//! request's [`Context`](crate::context::Context).
//!
//! Built-ins:
//! - [`ApiKeyMiddleware`] and [`CookieAuthMiddleware`] for credentials
//! - [`CorsPolicy`], applied by the dispatcher to every response rather than
//!   per operation

mod auth;
mod core;
mod cors;
mod pipeline;

pub use auth::{
    ApiKeyMiddleware, AuthScheme, Authenticated, CookieAuthMiddleware, CredentialValidator,
    API_KEY_INVALID, API_KEY_MISSING, AUTH_NOT_IMPLEMENTED, SESSION_COOKIE_INVALID,
    SESSION_COOKIE_MISSING,
};
pub use core::{FnMiddleware, Middleware};
pub use cors::{CorsConfigError, CorsPolicy, CORS_ALLOWED_HEADERS, CORS_ALLOWED_METHODS};
pub use pipeline::Next;
pub(crate) use pipeline::Chain;
