//! The two-phase onion.
//!
//! ```text
//! pre[0] -> pre[1] -> .. -> (read + validate body) -> post[0] -> .. -> handler
//! ```
//!
//! Each frame gets a [`Next`] for "everything after me". A `Next` runs at most
//! once; a second call is reported to the caller as a fault and also poisons
//! the whole pipeline, so the request ends in a 500 even if the middleware
//! swallows the error.

use super::Middleware;
use crate::context::Context;
use crate::dispatcher::{HandlerResponse, OperationHandler, RequestView};
use crate::error::{codes, Failure, Fault, HttpError};
use crate::operation::Operation;
use crate::server::{Body, BodyRead};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Pre(usize),
    Post(usize),
}

/// Everything one pipeline run needs, shared by reference across frames.
pub(crate) struct Chain<'a> {
    pub(crate) operation: &'a Operation,
    pub(crate) pre: &'a [Arc<dyn Middleware>],
    pub(crate) post: &'a [Arc<dyn Middleware>],
    pub(crate) handler: &'a dyn OperationHandler,
    pub(crate) body: RefCell<Body>,
    pub(crate) max_body_bytes: usize,
    double_next: Cell<Option<usize>>,
}

impl<'a> Chain<'a> {
    pub(crate) fn new(
        operation: &'a Operation,
        pre: &'a [Arc<dyn Middleware>],
        post: &'a [Arc<dyn Middleware>],
        handler: &'a dyn OperationHandler,
        body: Body,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            operation,
            pre,
            post,
            handler,
            body: RefCell::new(body),
            max_body_bytes,
            double_next: Cell::new(None),
        }
    }

    /// Run the whole chain from the first pre-body middleware.
    pub(crate) fn run(&self, view: &RequestView, ctx: &mut Context) -> Result<HandlerResponse, Failure> {
        let result = self.run_stage(Stage::Pre(0), view, ctx);
        if let Some(count) = self.double_next.get() {
            return Err(Fault::new(format!(
                "next() was called more than once ({count} extra calls) while handling '{}'",
                self.operation.operation_id
            ))
            .into());
        }
        result
    }

    fn run_stage(
        &self,
        stage: Stage,
        view: &RequestView,
        ctx: &mut Context,
    ) -> Result<HandlerResponse, Failure> {
        match stage {
            Stage::Pre(i) if i < self.pre.len() => {
                self.run_middleware(&self.pre[i], Stage::Pre(i + 1), view, ctx)
            }
            Stage::Pre(_) => {
                let body = self.read_body()?;
                let view = view.with_body(body);
                self.run_stage(Stage::Post(0), &view, ctx)
            }
            Stage::Post(i) if i < self.post.len() => {
                self.run_middleware(&self.post[i], Stage::Post(i + 1), view, ctx)
            }
            Stage::Post(_) => {
                debug!(operation_id = %self.operation.operation_id, "Invoking handler");
                self.handler.handle(view, ctx)
            }
        }
    }

    fn run_middleware(
        &self,
        mw: &Arc<dyn Middleware>,
        after: Stage,
        view: &RequestView,
        ctx: &mut Context,
    ) -> Result<HandlerResponse, Failure> {
        debug!(middleware = %mw.name(), "Middleware enter");
        let mut next = Next {
            chain: self,
            stage: after,
            view: view.clone(),
            caller: mw.name(),
            used: false,
        };
        let result = mw.handle(view, ctx, self.operation, &mut next);
        if !next.used {
            debug!(middleware = %mw.name(), "Middleware short-circuited");
        }
        result
    }

    fn read_body(&self) -> Result<Value, Failure> {
        let mut body = self.body.borrow_mut();
        let Some(ty) = &self.operation.request_body else {
            if let Err(e) = body.drain() {
                debug!(error = %e, "Failed to drain undeclared body");
            }
            return Ok(Value::Null);
        };

        let bytes = match body
            .read_limited(self.max_body_bytes)
            .map_err(|e| Fault::new(format!("failed to read request body: {e}")))?
        {
            BodyRead::Complete(bytes) => bytes,
            BodyRead::TooLarge => {
                return Err(HttpError::new(
                    413,
                    codes::REQUEST_BODY_TOO_LARGE,
                    "Request body too large",
                )
                .with_detail(format!("limit is {} bytes", self.max_body_bytes))
                .into());
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(HttpError::new(400, codes::REQUEST_BODY_MISSING, "Request body missing")
                .with_detail(format!("expected a {} body", ty.name()))
                .into());
        }

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            HttpError::new(400, codes::REQUEST_BODY_NOT_JSON, "Request body cannot be parsed into JSON")
                .with_detail(e.to_string())
        })?;

        let issues = ty.validate(&value, "body");
        if !issues.is_empty() {
            return Err(HttpError::new(400, codes::REQUEST_BODY_INVALID, "Request body did not validate")
                .with_detail(format!("body is not a valid {}", ty.name()))
                .with_issues(&issues)
                .into());
        }
        Ok(value)
    }
}

/// One-shot continuation handed to a middleware.
pub struct Next<'a> {
    chain: &'a Chain<'a>,
    stage: Stage,
    view: RequestView,
    caller: &'a str,
    used: bool,
}

impl Next<'_> {
    /// Run everything after the current middleware.
    ///
    /// # Errors
    ///
    /// Whatever the rest of the chain fails with, or a fault if this `Next`
    /// was already run.
    pub fn run(&mut self, ctx: &mut Context) -> Result<HandlerResponse, Failure> {
        if self.used {
            let extra = self.chain.double_next.get().unwrap_or(0) + 1;
            self.chain.double_next.set(Some(extra));
            return Err(Fault::new(format!(
                "middleware '{}' called next() more than once",
                self.caller
            ))
            .into());
        }
        self.used = true;
        self.chain.run_stage(self.stage, &self.view, ctx)
    }

    /// Whether [`run`](Next::run) has been called.
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestId;
    use crate::error::ErrorFactory;
    use crate::extract::RequestValues;
    use crate::middleware::FnMiddleware;
    use crate::server::HeaderVec;
    use crate::types::{NamedType, UnderlyingType};
    use http::Method;
    use serde_json::json;

    fn view() -> RequestView {
        RequestView::new(
            RequestId::new(),
            Method::POST,
            "/things",
            HeaderVec::new(),
            HeaderVec::new(),
            RequestValues::default(),
        )
    }

    fn ctx() -> Context {
        Context::new(RequestId::new(), "op", ErrorFactory::default())
    }

    fn echo_body(req: &RequestView, _ctx: &mut Context) -> Result<HandlerResponse, Failure> {
        Ok(HandlerResponse::json(req.body().cloned().unwrap_or(json!("none"))))
    }

    #[test]
    fn test_handler_sees_null_body_when_none_declared() {
        let op = Operation::new(Method::POST, "/things", "op");
        let chain = Chain::new(&op, &[], &[], &echo_body, Body::from_bytes("ignored"), 1024);
        let res = chain.run(&view(), &mut ctx()).unwrap();
        assert_eq!(res.body, Some(Value::Null));
        assert!(chain.body.borrow().is_drained());
    }

    #[test]
    fn test_body_errors() {
        let ty = Arc::new(NamedType::new("Thing", UnderlyingType::Object, json!({"type": "object"})));
        let op = Operation::new(Method::POST, "/things", "op").request_body(ty);
        let cases = [
            ("", 400, codes::REQUEST_BODY_MISSING),
            ("{nope", 400, codes::REQUEST_BODY_NOT_JSON),
            ("[1]", 400, codes::REQUEST_BODY_INVALID),
            ("{\"pad\":\"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx\"}", 413, codes::REQUEST_BODY_TOO_LARGE),
        ];
        for (raw, status, code) in cases {
            let chain = Chain::new(&op, &[], &[], &echo_body, Body::from_bytes(raw), 16);
            match chain.run(&view(), &mut ctx()).unwrap_err() {
                Failure::Http(e) => {
                    assert_eq!(e.code, status, "body {raw:?}");
                    assert_eq!(e.error_type, code);
                }
                Failure::Fault(f) => panic!("unexpected fault {f}"),
            }
        }
    }

    #[test]
    fn test_pre_body_middleware_sees_no_body() {
        let seen: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("peek", |req, ctx, _op, next| {
            ctx.set("peek", "had_body", json!(req.body().is_some()));
            next.run(ctx)
        }));
        let op = Operation::new(Method::POST, "/things", "op");
        let pre = [Arc::clone(&seen)];
        let post = [seen];
        let chain = Chain::new(&op, &pre, &[], &echo_body, Body::empty(), 16);
        let mut c = ctx();
        chain.run(&view(), &mut c).unwrap();
        assert_eq!(c.value("peek", "had_body"), Some(&json!(false)));

        let chain = Chain::new(&op, &[], &post, &echo_body, Body::empty(), 16);
        let mut c = ctx();
        chain.run(&view(), &mut c).unwrap();
        assert_eq!(c.value("peek", "had_body"), Some(&json!(true)));
    }

    #[test]
    fn test_swallowed_double_next_still_faults() {
        let twice: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("twice", |_req, ctx, _op, next| {
            let first = next.run(ctx)?;
            let second = next.run(ctx);
            assert!(second.is_err());
            Ok(first)
        }));
        let op = Operation::new(Method::POST, "/things", "op");
        let pre = [twice];
        let chain = Chain::new(&op, &pre, &[], &echo_body, Body::empty(), 16);
        let err = chain.run(&view(), &mut ctx()).unwrap_err();
        assert!(err.is_fault());
    }
}
