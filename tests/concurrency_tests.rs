use http::Method;
use opsrouter::dispatcher::HandlerResponse;
use opsrouter::middleware::FnMiddleware;
use opsrouter::operation::{Operation, ParamDecl};
use opsrouter::runtime::{dispatch_concurrently, join_response, spawn_dispatch};
use opsrouter::runtime_config::RuntimeConfig;
use opsrouter::server::Request;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;
use common::*;

fn runtime() -> RuntimeConfig {
    RuntimeConfig { stack_size: 0x40000 }
}

fn echo_service(counter: Arc<AtomicUsize>) -> Arc<opsrouter::Dispatcher> {
    Arc::new(dispatcher(
        builder()
            .pre_body(FnMiddleware::new("count", move |_req, ctx, _op, next| {
                counter.fetch_add(1, Ordering::SeqCst);
                next.run(ctx)
            }))
            .operation(
                Operation::new(Method::GET, "/echo/:n", "echo")
                    .url_param(ParamDecl::required("n", number("N")))
                    .uses("count"),
            )
            .handler("echo", |req, ctx| {
                push_trail(ctx, "handler");
                Ok(HandlerResponse::json(json!({
                    "n": req.url().required_number("n")?,
                    // Each request has its own context.
                    "trail": trail(ctx),
                })))
            }),
    ))
}

#[test]
fn test_concurrent_dispatch_keeps_requests_apart() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = echo_service(Arc::clone(&counter));
    let requests: Vec<Request> = (0..64).map(|n| Request::get(&format!("/echo/{n}"))).collect();

    let responses = dispatch_concurrently(&d, requests, &runtime()).unwrap();
    assert_eq!(responses.len(), 64);
    for (n, res) in responses.iter().enumerate() {
        assert_eq!(res.status, 200);
        let body = res.body_json().unwrap();
        assert_eq!(body["n"].as_f64(), Some(n as f64));
        assert_eq!(body["trail"], json!(["handler"]));
    }
    assert_eq!(counter.load(Ordering::SeqCst), 64);
}

#[test]
fn test_panicking_handler_does_not_affect_others() {
    let d = Arc::new(dispatcher(
        builder()
            .operation(
                Operation::new(Method::GET, "/maybe/:n", "maybe")
                    .url_param(ParamDecl::required("n", number("N"))),
            )
            .handler("maybe", |req, _ctx| {
                let n = req.url().required_number("n")?;
                if n % 2.0 == 0.0 {
                    panic!("even numbers are unlucky");
                }
                Ok(HandlerResponse::json(json!(n)))
            }),
    ));
    let requests: Vec<Request> = (0..16).map(|n| Request::get(&format!("/maybe/{n}"))).collect();
    let responses = dispatch_concurrently(&d, requests, &runtime()).unwrap();
    for (n, res) in responses.iter().enumerate() {
        if n % 2 == 0 {
            assert_eq!(res.status, 500, "{n}");
            assert!(!res.body_str().unwrap().contains("unlucky"));
        } else {
            assert_eq!(res.status, 200, "{n}");
        }
    }
}

#[test]
fn test_spawned_dispatch_sees_shared_config() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = echo_service(Arc::clone(&counter));
    let handles: Vec<_> = (0..4)
        .map(|n| spawn_dispatch(Arc::clone(&d), Request::get(&format!("/echo/{n}")), &runtime()).unwrap())
        .collect();
    let statuses: Vec<u16> = handles.into_iter().map(|h| join_response(h).status).collect();
    assert_eq!(statuses, vec![200; 4]);
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}
