use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use opsrouter::prelude::*;
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn zoo() -> ServiceConfig {
    let id = Arc::new(NamedType::number("Id"));
    let name = Arc::new(NamedType::string("Name"));
    let patterns: [(Method, &str, &str, &[&str]); 7] = [
        (Method::GET, "/zoo/animals", "getAnimals", &[]),
        (Method::POST, "/zoo/animals", "createAnimal", &[]),
        (Method::GET, "/zoo/animals/:id", "getAnimal", &["id"]),
        (Method::DELETE, "/zoo/animals/:id", "deleteAnimal", &["id"]),
        (Method::GET, "/zoo/animals/:id/toys/:toy", "animalToy", &["id", "toy"]),
        (
            Method::GET,
            "/zoo/:category/animals/:id/habitats/:habitat/sections/:section",
            "habitatSection",
            &["category", "id", "habitat", "section"],
        ),
        (
            Method::POST,
            "/inventory/:warehouse/feeds/:feed/items/:item/batches/:batch",
            "postItemBatch",
            &["warehouse", "feed", "item", "batch"],
        ),
    ];

    let mut builder = ServiceConfig::builder().title("Zoo");
    for (method, pattern, op_id, params) in patterns {
        let mut op = Operation::new(method, pattern, op_id);
        for p in params {
            let ty = if *p == "category" { &name } else { &id };
            op = op.url_param(ParamDecl::required(*p, Arc::clone(ty)));
        }
        builder = builder
            .operation(op)
            .handler(op_id, |_r, _c| Ok(HandlerResponse::json(json!({"ok": true}))));
    }
    builder.build().unwrap()
}

fn bench_route_match(c: &mut Criterion) {
    let config = zoo();
    let router = config.router();
    let paths = [
        (Method::GET, "/zoo/animals/123"),
        (Method::GET, "/zoo/animals/123/toys/456"),
        (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
        (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
        (Method::GET, "/no/such/path"),
    ];
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in &paths {
                black_box(router.route(method, path));
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let dispatcher = Dispatcher::new(Arc::new(zoo()));
    c.bench_function("dispatch_get", |b| {
        b.iter(|| black_box(dispatcher.dispatch(Request::get("/zoo/animals/123/toys/456"))))
    });
    c.bench_function("dispatch_not_found", |b| {
        b.iter(|| black_box(dispatcher.dispatch(Request::get("/no/such/path"))))
    });
}

criterion_group!(benches, bench_route_match, bench_dispatch);
criterion_main!(benches);
