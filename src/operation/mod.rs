//! # Operation Module
//!
//! The declarative model the router and the OpenAPI synthesizer share. An
//! [`Operation`] names a method and a `:name`-style url pattern, declares its
//! typed inputs and outputs, its success code, and the catalogue of
//! [`FailureDefinition`]s it may raise.
//!
//! ```rust
//! use opsrouter::operation::{FailureDefinition, Operation, ParamDecl};
//! use opsrouter::types::NamedType;
//! use http::Method;
//! use std::sync::Arc;
//!
//! let id = Arc::new(NamedType::number("TestId"));
//! let op = Operation::new(Method::GET, "/tests/:id", "getTest")
//!     .url_param(ParamDecl::required("id", id))
//!     .failure(FailureDefinition::new("testNotFound", 404, "No test with that id"));
//! assert!(opsrouter::operation::check_operation(&op).is_empty());
//! ```

mod build;
mod types;

pub use build::check_operation;
pub use types::*;
