//! # opsrouter
//!
//! **opsrouter** is a declarative HTTP operation router. Endpoints are
//! described once as [`Operation`]s (method, `:name` url pattern, typed
//! url/header/query params, typed bodies, a failure catalogue) and the same
//! model drives both request dispatch and the OpenAPI document served at
//! `GET /openapi`.
//!
//! ## Architecture
//!
//! - **[`types`]** - named types: an underlying kind, a JSON schema and a validator
//! - **[`operation`]** - operation declarations and their consistency checks
//! - **[`router`]** - declaration-order path matching with `:name` captures
//! - **[`extract`]** - raw string to typed value conversion and the per-request value stores
//! - **[`error`]** - declared HTTP errors, faults, the error factory and the wire format
//! - **[`context`]** - the request-scoped store shared by middleware and handler
//! - **[`middleware`]** - the two-phase onion, auth middleware and CORS
//! - **[`dispatcher`]** - the entry point tying all of the above together
//! - **[`openapi`]** - OpenAPI document synthesis from the operation model
//! - **[`config`]** - the immutable service model and file-loadable settings
//! - **[`server`]** - request/response objects and the reserved endpoints
//! - **[`runtime`]** - hosting dispatch on `may` coroutines
//! - **[`logging`]** - `tracing-subscriber` setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Dispatcher
//!     participant Router
//!     participant Extract as Value Reader
//!     participant Pre as Pre-body middleware
//!     participant Body as Body reader
//!     participant Post as Post-body middleware
//!     participant Handler
//!
//!     Host->>Dispatcher: dispatch(Request)
//!     Dispatcher->>Dispatcher: OPTIONS / reserved paths / api version
//!     Dispatcher->>Router: route(method, path)
//!     alt No match
//!         Router-->>Host: 404 resourceNotFound
//!     end
//!     Router-->>Dispatcher: RouteMatch
//!     Dispatcher->>Extract: url, header, query values
//!     alt Bad input
//!         Extract-->>Host: 400
//!     end
//!     Dispatcher->>Pre: next()
//!     Pre->>Body: next()
//!     Body->>Body: read, parse, validate
//!     Body->>Post: next()
//!     Post->>Handler: next()
//!     Handler-->>Dispatcher: HandlerResponse or Failure
//!     Dispatcher->>Dispatcher: serialize, drain body, identity headers, CORS
//!     Dispatcher-->>Host: Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use opsrouter::prelude::*;
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let pet_id = Arc::new(NamedType::number("PetId"));
//! let config = ServiceConfig::builder()
//!     .title("Pets")
//!     .operation(
//!         Operation::new(Method::GET, "/pets/:id", "getPet")
//!             .url_param(ParamDecl::required("id", pet_id))
//!             .failure(FailureDefinition::new("petNotFound", 404, "Pet not found")),
//!     )
//!     .handler("getPet", |req, ctx| {
//!         let id = req.url().required_number("id")?;
//!         if id > 100.0 {
//!             return Err(ctx.error("petNotFound").into());
//!         }
//!         Ok(HandlerResponse::json(json!({ "id": id, "name": "Rex" })))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(Arc::new(config));
//! let res = dispatcher.dispatch(Request::get("/pets/7"));
//! assert_eq!(res.status, 200);
//! assert_eq!(dispatcher.dispatch(Request::get("/pets/700")).status, 404);
//! ```
//!
//! ## Runtime Considerations
//!
//! Dispatch is synchronous. Hosts run each request on its own `may`
//! coroutine (see [`runtime::spawn_dispatch`]); the stack size comes from
//! `OPSR_STACK_SIZE`. There is no per-request timeout.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod logging;
pub mod middleware;
pub mod openapi;
pub mod operation;
pub mod router;
pub mod runtime;
pub mod runtime_config;
pub mod server;
pub mod static_files;
pub mod types;
pub mod validator;

/// The types most services need.
pub mod prelude {
    pub use crate::config::{BuildInfo, ServiceConfig, ServiceSettings};
    pub use crate::context::{Context, RequestId};
    pub use crate::dispatcher::{Dispatcher, HandlerResponse, OperationHandler, RequestView};
    pub use crate::error::{Failure, Fault, HttpError};
    pub use crate::middleware::{ApiKeyMiddleware, CookieAuthMiddleware, FnMiddleware, Middleware, Next};
    pub use crate::operation::{FailureDefinition, Operation, ParamDecl, ResponseHeaderDecl};
    pub use crate::server::{Body, Request, Response};
    pub use crate::types::{NamedType, UnderlyingType};
}

pub use config::{ServiceConfig, ServiceSettings};
pub use dispatcher::Dispatcher;
pub use error::{Failure, Fault, HttpError};
pub use operation::Operation;
