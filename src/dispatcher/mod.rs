//! # Dispatcher Module
//!
//! The single entry point of the router: [`Dispatcher::dispatch`] takes a
//! parsed [`Request`](crate::server::Request) and always returns a
//! [`Response`](crate::server::Response).
//!
//! ## Request Flow
//!
//! 1. `OPTIONS` on any path answers the CORS preflight
//! 2. `GET` on a reserved path (`/`, `/health`, `/openapi`, `/docs`,
//!    `/docs/assets/*`) is answered directly
//! 3. A required api-version header is checked before any routing
//! 4. Operations are scanned in declaration order; the first match by
//!    method and then pattern wins, otherwise 404
//! 5. Url, header and query values are extracted and validated
//! 6. The middleware pipeline runs: pre-body middleware, body read and
//!    validation, post-body middleware, the handler
//! 7. The handler's [`HandlerResponse`] is serialized with the operation's
//!    success code and declared response headers
//!
//! ## Error Handling
//!
//! The dispatcher is the only recovery boundary. Declared failures are
//! written in the error wire format with their own status. Faults and
//! handler panics are logged with full detail and answered with a generic
//! 500. Whatever happens, the unread part of the request body is drained
//! before returning.
//!
//! There is no timeout: a handler that never returns holds its request
//! forever. Bound request time in the host or a proxy in front of it.
//!
//! ## Example
//!
//! ```rust
//! use opsrouter::config::ServiceConfig;
//! use opsrouter::dispatcher::{Dispatcher, HandlerResponse};
//! use opsrouter::operation::{Operation, ParamDecl};
//! use opsrouter::server::Request;
//! use opsrouter::types::NamedType;
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let config = ServiceConfig::builder()
//!     .operation(
//!         Operation::new(Method::GET, "/tests/:id", "getTest")
//!             .url_param(ParamDecl::required("id", Arc::new(NamedType::number("TestId")))),
//!     )
//!     .handler("getTest", |req, _ctx| {
//!         Ok(HandlerResponse::json(json!({ "id": req.url().required_number("id")? })))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(Arc::new(config));
//! assert_eq!(dispatcher.dispatch(Request::get("/tests/42")).status, 200);
//! assert_eq!(dispatcher.dispatch(Request::get("/tests/abc")).status, 400);
//! ```

mod core;
mod handler;

pub use core::{Dispatcher, BUILD_COMMIT_HEADER, BUILD_TIMESTAMP_HEADER, REQUEST_ID_HEADER};
pub use handler::{HandlerResponse, OperationHandler, RequestView};
