#![allow(dead_code)]

use http::Method;
use opsrouter::config::{BuildInfo, ServiceConfigBuilder};
use opsrouter::context::Context;
use opsrouter::dispatcher::{Dispatcher, HandlerResponse};
use opsrouter::error::HttpError;
use opsrouter::middleware::FnMiddleware;
use opsrouter::server::{Body, Request, Response};
use opsrouter::types::NamedType;
use opsrouter::ServiceConfig;
use serde_json::json;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const API_VERSION_HEADER: &str = "x-api-version";
pub const API_VERSION: &str = "2026-01-01";

pub fn number(name: &str) -> Arc<NamedType> {
    Arc::new(NamedType::number(name))
}

pub fn string(name: &str) -> Arc<NamedType> {
    Arc::new(NamedType::string(name))
}

pub fn boolean(name: &str) -> Arc<NamedType> {
    Arc::new(NamedType::boolean(name))
}

/// Builder with a fixed build identity.
pub fn builder() -> ServiceConfigBuilder {
    ServiceConfig::builder().title("Test service").build_info(BuildInfo {
        commit: "0123abc".into(),
        timestamp: "2026-01-01T00:00:00Z".into(),
    })
}

pub fn dispatcher(builder: ServiceConfigBuilder) -> Dispatcher {
    Dispatcher::new(Arc::new(builder.build().unwrap()))
}

/// GET carrying the api-version header.
pub fn get(path: &str) -> Request {
    Request::get(path).header(API_VERSION_HEADER, API_VERSION)
}

pub fn request(method: Method, path: &str) -> Request {
    Request::new(method, path).header(API_VERSION_HEADER, API_VERSION)
}

/// Parse the wire error out of a failure response.
pub fn error_of(res: &Response) -> HttpError {
    HttpError::from_response(res).unwrap()
}

/// Names of the middleware (and `handler`) that ran, in order.
#[derive(Debug, Clone, Default)]
pub struct Trail(pub Vec<String>);

pub fn push_trail(ctx: &mut Context, name: &str) {
    match ctx.get_mut::<Trail>() {
        Some(trail) => trail.0.push(name.to_owned()),
        None => {
            ctx.insert(Trail(vec![name.to_owned()]));
        }
    }
}

pub fn trail(ctx: &Context) -> Vec<String> {
    ctx.get::<Trail>().map(|t| t.0.clone()).unwrap_or_default()
}

/// Middleware that records its name (and whether it saw a body) then continues.
pub fn recorder(name: &'static str) -> FnMiddleware {
    FnMiddleware::new(name, move |req, ctx, _op, next| {
        let entry = if req.body().is_some() {
            format!("{name}+body")
        } else {
            name.to_owned()
        };
        push_trail(ctx, &entry);
        next.run(ctx)
    })
}

/// Handler that returns the trail as its JSON body.
pub fn trail_handler(
    _req: &opsrouter::dispatcher::RequestView,
    ctx: &mut Context,
) -> Result<HandlerResponse, opsrouter::Failure> {
    push_trail(ctx, "handler");
    Ok(HandlerResponse::json(json!(trail(ctx))))
}

/// Reader that counts how many bytes were pulled from it.
pub struct CountingReader {
    inner: io::Cursor<Vec<u8>>,
    read: Arc<AtomicUsize>,
}

impl io::Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

/// A streaming body plus a counter of the bytes consumed from it.
pub fn counted_body(bytes: Vec<u8>) -> (Body, Arc<AtomicUsize>) {
    let read = Arc::new(AtomicUsize::new(0));
    let reader = CountingReader {
        inner: io::Cursor::new(bytes),
        read: Arc::clone(&read),
    };
    (Body::from_reader(reader), read)
}
