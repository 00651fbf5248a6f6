//! # Specification Synthesizer
//!
//! Builds an OpenAPI 3.0 document from the same [`ServiceConfig`](crate::config::ServiceConfig)
//! the dispatcher routes with. The document is produced on demand (the
//! dispatcher serves it at `GET /openapi`) so it can never drift from what is
//! actually being served.
//!
//! - Paths use `{name}` segments and merge every method declared on a pattern.
//! - Parameters are listed url, then header, then query.
//! - One response per success code and per distinct failure status; failures
//!   sharing a status have their summaries joined into one description.
//! - Security requirements appear only on operations whose middleware use an
//!   api key or a session cookie.
//! - Named types land in `components.schemas` through a [`SchemaRegistry`].

mod build;
mod registry;

pub use build::{
    build_spec, Components, HeaderObject, Info, MediaTypeObject, OpenApiDocument, OperationObject,
    ParameterObject, RequestBodyObject, ResponseObject, SchemaRef, SecuritySchemeObject,
    API_KEY_SCHEME, COOKIE_AUTH_SCHEME, NO_API_VERSION, OPENAPI_VERSION,
};
pub use registry::{schema_ref, SchemaRegistry, SCHEMA_REF_PREFIX};
