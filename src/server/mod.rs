//! # Server Module
//!
//! The request and response objects the dispatcher consumes and produces,
//! plus the reserved infrastructure endpoints.
//!
//! The router performs no network I/O: a host (an HTTP server, a test, a
//! benchmark) parses the wire request into a [`Request`], hands it to
//! [`Dispatcher::dispatch`](crate::dispatcher::Dispatcher::dispatch) and
//! writes the returned [`Response`] back out.
//!
//! ## Reserved endpoints
//!
//! | Path | Response |
//! |---|---|
//! | `GET /` | HTML page listing the operations |
//! | `GET /health` | liveness text with the build identity |
//! | `GET /openapi` | the synthesized specification as JSON |
//! | `GET /docs` | documentation viewer page |
//! | `GET /docs/assets/*` | files from the configured assets directory |

pub mod request;
pub mod response;
pub mod service;

pub use request::{parse_cookies, parse_query, Body, BodyRead, Request};
pub use response::{
    status_reason, HeaderVec, Response, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT,
    MAX_INLINE_HEADERS,
};
pub use service::{is_reserved_path, ReservedEndpoints};
