//! # Router Module
//!
//! Path matching for declared operations.
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: when the service configuration is built, each
//!    operation's `:name` pattern (e.g. `/pets/:id`) is compiled into an
//!    anchored regex plus its ordered parameter names.
//!
//! 2. **Matching**: for each request the router scans the compiled table in
//!    declaration order, comparing method first and then path, and returns
//!    the first hit with its url parameters extracted.
//!
//! There is no specificity ranking. With overlapping patterns
//! and the same method, the operation registered first wins.
//!
//! ## Example
//!
//! ```rust
//! use opsrouter::operation::Operation;
//! use opsrouter::router::Router;
//! use http::Method;
//! use std::sync::Arc;
//!
//! let ops = vec![Arc::new(Operation::new(Method::GET, "/pets/:id", "getPet"))];
//! let router = Router::new(&ops).unwrap();
//! let m = router.route(&Method::GET, "/pets/12").unwrap();
//! assert_eq!(m.url_param("id"), Some("12"));
//! ```

mod core;

pub use core::{pattern_tokens, to_openapi_path, ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
