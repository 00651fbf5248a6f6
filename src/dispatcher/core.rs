use super::handler::{HandlerResponse, RequestView};
use crate::config::{ResolvedOperation, ServiceConfig};
use crate::context::{Context, RequestId};
use crate::error::{codes, Failure, Fault, HttpError};
use crate::extract::{extract_values, header_value_string};
use crate::middleware::Chain;
use crate::operation::Operation;
use crate::router::RouteMatch;
use crate::server::{parse_cookies, parse_query, Body, ReservedEndpoints, Request, Response};
use http::Method;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const BUILD_COMMIT_HEADER: &str = "x-build-commit";
pub const BUILD_TIMESTAMP_HEADER: &str = "x-build-timestamp";

/// Routes requests to operations and runs them.
///
/// `dispatch` never panics and never returns an error: every failure,
/// including a panicking handler, becomes a response. The dispatcher holds
/// no per-request state, so one instance can serve any number of requests
/// concurrently.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Arc<ServiceConfig>,
    reserved: ReservedEndpoints,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        let reserved = ReservedEndpoints::new(&config);
        Self { config, reserved }
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Handle one request end to end.
    pub fn dispatch(&self, mut req: Request) -> Response {
        let start = Instant::now();
        let request_id = RequestId::from_header_or_new(req.get_header(REQUEST_ID_HEADER));
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            method = %req.method,
            path = %req.path()
        );
        let _enter = span.enter();

        let mut body = std::mem::take(&mut req.body);
        let outcome = guard(req.path(), || self.respond(&req, &mut body, request_id));
        let mut res = match outcome {
            Ok(res) => res,
            Err(failure) => failure_response(failure),
        };

        match body.drain() {
            Ok(0) => {}
            Ok(n) => debug!(bytes = n, "Drained unread request body"),
            Err(e) => warn!(error = %e, "Failed to drain request body"),
        }

        self.finish(&mut res, &req, request_id);
        info!(
            status = res.status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request complete"
        );
        res
    }

    fn respond(&self, req: &Request, body: &mut Body, request_id: RequestId) -> Result<Response, Failure> {
        let path = req.path();

        if req.method == Method::OPTIONS {
            debug!("CORS preflight");
            return Ok(self.config.cors().preflight(req.get_header("origin")));
        }
        if req.method == Method::GET {
            if let Some(res) = self.reserved.respond(&self.config, path) {
                return res;
            }
        }

        let policy = &self.config.settings().api_version;
        if policy.required && req.get_header(&policy.header).map_or(true, str::is_empty) {
            return Err(HttpError::new(400, codes::API_VERSION_MISSING, "API version missing")
                .with_detail(format!("header '{}' is required", policy.header))
                .into());
        }

        let Some(route) = self.config.router().route(&req.method, path) else {
            debug!("No operation matched");
            return Err(HttpError::not_found().into());
        };
        let resolved = self.config.operations().get(route.index).ok_or_else(|| {
            Fault::new(format!("route index {} has no operation", route.index))
        })?;
        debug!(operation_id = %resolved.operation.operation_id, "Operation matched");

        self.run_operation(req, body, request_id, &route, resolved)
    }

    fn run_operation(
        &self,
        req: &Request,
        body: &mut Body,
        request_id: RequestId,
        route: &RouteMatch,
        resolved: &ResolvedOperation,
    ) -> Result<Response, Failure> {
        let op = resolved.operation.as_ref();
        let mut ctx = Context::new(request_id, &op.operation_id, resolved.errors.clone());
        let chain = Chain::new(
            op,
            &resolved.pre,
            &resolved.post,
            resolved.handler.as_ref(),
            std::mem::take(body),
            self.config.settings().max_body_bytes,
        );

        let outcome = guard(&op.operation_id, || {
            let query = parse_query(req.query());
            let values = extract_values(op, &route.url_params, &req.headers, &query)?;
            let view = RequestView::new(
                request_id,
                req.method.clone(),
                req.path(),
                req.headers.clone(),
                parse_cookies(req.get_header("cookie")),
                values,
            );
            chain.run(&view, &mut ctx)
        });
        *body = chain.body.into_inner();

        outcome.map(|res| serialize(op, res))
    }

    fn finish(&self, res: &mut Response, req: &Request, request_id: RequestId) {
        let build = self.config.build_info();
        res.set_header(BUILD_COMMIT_HEADER, build.commit.clone());
        res.set_header(BUILD_TIMESTAMP_HEADER, build.timestamp.clone());
        res.set_header(REQUEST_ID_HEADER, request_id.to_string());
        self.config.cors().apply(req.get_header("origin"), res);
    }
}

/// Turn a handler's result into a response.
///
/// Declared response headers are always present, rendered empty when the
/// handler did not set them.
fn serialize(op: &Operation, out: HandlerResponse) -> Response {
    let status = out.status.unwrap_or(op.success_code);
    let mut res = match &out.body {
        Some(body) => Response::json(status, body),
        None => Response::new(status),
    };
    for decl in &op.response_headers {
        let value = out.header(&decl.name).map(header_value_string).unwrap_or_default();
        res.set_header(&decl.name, value);
    }
    for (name, value) in &out.headers {
        if !op.response_headers.iter().any(|d| d.name.eq_ignore_ascii_case(name)) {
            res.set_header(name, header_value_string(value));
        }
    }
    res
}

/// The single conversion from a failure to a response.
///
/// Faults are logged in full and answered with a generic 500.
fn failure_response(failure: Failure) -> Response {
    match failure {
        Failure::Http(e) if e.is_client_error() => {
            warn!(
                status = e.code,
                error_type = %e.error_type,
                detail = e.detail.as_deref().unwrap_or(""),
                error_class = "client",
                "Request rejected"
            );
            e.to_response()
        }
        Failure::Http(e) => {
            warn!(
                status = e.code,
                error_type = %e.error_type,
                detail = e.detail.as_deref().unwrap_or(""),
                error_class = "declared",
                "Request failed"
            );
            e.to_response()
        }
        Failure::Fault(f) => {
            error!(fault = %f.message(), error_class = "fault", "Internal fault");
            HttpError::internal().to_response()
        }
    }
}

/// Run `f`, turning a panic into a fault labelled with `what`.
fn guard<T, F>(what: &str, f: F) -> Result<T, Failure>
where
    F: FnOnce() -> Result<T, Failure>,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
        Err(Fault::new(format!("'{what}' panicked: {}", panic_message(panic.as_ref()))).into())
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{ParamDecl, ResponseHeaderDecl};
    use crate::types::NamedType;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let count = Arc::new(NamedType::number("Count"));
        let config = ServiceConfig::builder()
            .operation(
                Operation::new(Method::POST, "/items", "createItem")
                    .success_code(201)
                    .response_header(ResponseHeaderDecl::new("x-count", count))
                    .response_header(ResponseHeaderDecl::new("x-tag", Arc::new(NamedType::string("Tag")))),
            )
            .operation(
                Operation::new(Method::GET, "/items/:id", "getItem")
                    .url_param(ParamDecl::required("id", Arc::new(NamedType::number("ItemId")))),
            )
            .handler("createItem", |_r, _c| {
                Ok(HandlerResponse::empty().with_header("x-count", 3).with_header("x-extra", json!({"a": 1})))
            })
            .handler("getItem", |req, _c| {
                if req.url().required_number("id")? < 0.0 {
                    panic!("negative id");
                }
                Ok(HandlerResponse::json(json!({"id": req.url().required_number("id")?})))
            })
            .build()
            .unwrap();
        Dispatcher::new(Arc::new(config))
    }

    #[test]
    fn test_serialize_headers_and_status() {
        let res = dispatcher().dispatch(Request::new(Method::POST, "/items"));
        assert_eq!(res.status, 201);
        assert!(res.body.is_empty());
        assert_eq!(res.header("x-count"), Some("3"));
        assert_eq!(res.header("x-tag"), Some(""));
        assert_eq!(res.header("x-extra"), Some("{\"a\":1}"));
    }

    #[test]
    fn test_panic_becomes_generic_500() {
        let res = dispatcher().dispatch(Request::get("/items/-1"));
        assert_eq!(res.status, 500);
        let err = HttpError::from_response(&res).unwrap();
        assert_eq!(err.error_type, codes::INTERNAL_ERROR);
        assert!(err.detail.is_none());
    }

    #[test]
    fn test_guard_turns_panic_into_fault() {
        let out: Result<Response, Failure> = guard("/docs", || panic!("template blew up"));
        match out {
            Err(Failure::Fault(f)) => {
                assert!(f.message().contains("'/docs' panicked: template blew up"));
            }
            _ => panic!("expected a fault"),
        }
        let out: Result<(), Failure> = guard("/openapi", || panic!("boom"));
        let res = failure_response(out.unwrap_err());
        assert_eq!(res.status, 500);
        assert_eq!(HttpError::from_response(&res).unwrap().error_type, codes::INTERNAL_ERROR);

        let ok: Result<u8, Failure> = guard("/health", || Ok(7));
        assert!(matches!(ok, Ok(7)));
    }

    #[test]
    fn test_every_response_carries_identity_headers() {
        let d = dispatcher();
        for res in [
            d.dispatch(Request::get("/items/1")),
            d.dispatch(Request::get("/nowhere")),
            d.dispatch(Request::get("/health")),
        ] {
            assert!(res.header(BUILD_COMMIT_HEADER).is_some());
            assert!(res.header(BUILD_TIMESTAMP_HEADER).is_some());
            assert!(res.header(REQUEST_ID_HEADER).is_some());
        }
    }

    #[test]
    fn test_request_id_is_echoed() {
        let id = RequestId::new().to_string();
        let res = dispatcher().dispatch(Request::get("/items/1").header(REQUEST_ID_HEADER, id.clone()));
        assert_eq!(res.header(REQUEST_ID_HEADER), Some(id.as_str()));
    }
}
