//! Hosting dispatch on the `may` coroutine runtime.
//!
//! The dispatcher is synchronous and shares nothing mutable between
//! requests, so a host runs each request in its own coroutine against one
//! `Arc<Dispatcher>`.

use crate::dispatcher::Dispatcher;
use crate::error::HttpError;
use crate::runtime_config::RuntimeConfig;
use crate::server::{Request, Response};
use may::coroutine::{self, JoinHandle};
use std::io;
use std::sync::Arc;
use tracing::error;

/// Run one dispatch in a new coroutine.
///
/// # Errors
///
/// Fails if the coroutine cannot be spawned (typically out of memory for
/// its stack).
#[allow(unsafe_code)]
pub fn spawn_dispatch(
    dispatcher: Arc<Dispatcher>,
    req: Request,
    runtime: &RuntimeConfig,
) -> io::Result<JoinHandle<Response>> {
    // SAFETY: the closure owns everything it touches and does not rely on
    // thread-local state, which is what `may` requires of coroutine bodies.
    unsafe {
        coroutine::Builder::new()
            .name("dispatch".to_owned())
            .stack_size(runtime.stack_size)
            .spawn(move || dispatcher.dispatch(req))
    }
}

/// Dispatch every request concurrently and return responses in input order.
///
/// # Errors
///
/// Fails if any coroutine cannot be spawned. Requests already spawned still
/// run to completion.
pub fn dispatch_concurrently(
    dispatcher: &Arc<Dispatcher>,
    requests: Vec<Request>,
    runtime: &RuntimeConfig,
) -> io::Result<Vec<Response>> {
    let handles = requests
        .into_iter()
        .map(|req| spawn_dispatch(Arc::clone(dispatcher), req, runtime))
        .collect::<io::Result<Vec<_>>>()?;
    Ok(handles.into_iter().map(join_response).collect())
}

/// Wait for a spawned dispatch.
///
/// `dispatch` recovers handler panics itself, so a failed join means the
/// coroutine died outside it; that is answered with a generic 500.
#[must_use]
pub fn join_response(handle: JoinHandle<Response>) -> Response {
    handle.join().unwrap_or_else(|_| {
        error!(error_class = "fault", "Dispatch coroutine panicked");
        HttpError::internal().to_response()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::dispatcher::HandlerResponse;
    use crate::operation::Operation;
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_spawned_dispatch_returns_response() {
        let config = ServiceConfig::builder()
            .operation(Operation::new(Method::GET, "/ping", "ping"))
            .handler("ping", |_r, _c| Ok(HandlerResponse::json(json!("pong"))))
            .build()
            .unwrap();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(config)));
        let runtime = RuntimeConfig { stack_size: 0x40000 };
        let handle = spawn_dispatch(dispatcher, Request::get("/ping"), &runtime).unwrap();
        let res = join_response(handle);
        assert_eq!(res.status, 200);
        assert_eq!(res.body_json(), Some(json!("pong")));
    }
}
