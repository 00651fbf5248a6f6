use http::Method;
use opsrouter::config::ServiceSettings;
use opsrouter::context::RequestId;
use opsrouter::dispatcher::{HandlerResponse, REQUEST_ID_HEADER};
use opsrouter::operation::Operation;
use opsrouter::server::{Request, CONTENT_TYPE_HTML, CONTENT_TYPE_TEXT};
use serde_json::json;

mod common;
use common::*;

fn service() -> opsrouter::Dispatcher {
    dispatcher(
        builder()
            .require_api_version(API_VERSION_HEADER)
            .operation(Operation::new(Method::GET, "/pets", "listPets").display_name("List pets"))
            .operation(Operation::new(Method::POST, "/health", "postHealth"))
            .handler("listPets", |_r, _c| Ok(HandlerResponse::json(json!([]))))
            .handler("postHealth", |_r, _c| Ok(HandlerResponse::json(json!("operation")))),
    )
}

#[test]
fn test_health_reports_build_identity() {
    let res = service().dispatch(Request::get("/health"));
    assert_eq!(res.status, 200);
    assert_eq!(res.header("content-type"), Some(CONTENT_TYPE_TEXT));
    assert_eq!(
        res.body_str(),
        Some("ok\nservice: Test service\ncommit: 0123abc\ntimestamp: 2026-01-01T00:00:00Z\n")
    );
}

#[test]
fn test_reserved_paths_are_get_only() {
    // A non-GET request to a reserved path is routed like any other.
    let res = service().dispatch(request(Method::POST, "/health"));
    assert_eq!(res.body_json(), Some(json!("operation")));

    let res = service().dispatch(request(Method::DELETE, "/openapi"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_root_page() {
    let res = service().dispatch(Request::get("/"));
    assert_eq!(res.status, 200);
    assert_eq!(res.header("content-type"), Some(CONTENT_TYPE_HTML));
    let body = res.body_str().unwrap();
    assert!(body.contains("<title>Test service</title>"));
    assert!(body.contains("<code>GET /pets</code> List pets"));
    assert!(body.contains(r#"href="/openapi""#));
}

#[test]
fn test_docs_page_points_at_spec() {
    let res = service().dispatch(Request::get("/docs"));
    assert_eq!(res.status, 200);
    let body = res.body_str().unwrap();
    assert!(body.contains(r#"data-spec-url="/openapi""#));
    assert!(body.contains(r#"src="/docs/assets/viewer.js""#));
}

#[test]
fn test_docs_assets_served_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("viewer.js"), "window.viewer = true;").unwrap();
    std::fs::write(dir.path().join("viewer.css"), "body {}").unwrap();
    let settings = ServiceSettings {
        title: "Assets".into(),
        docs_assets_dir: Some(dir.path().to_path_buf()),
        ..ServiceSettings::default()
    };
    let d = dispatcher(builder().settings(settings));

    let res = d.dispatch(Request::get("/docs/assets/viewer.js"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body_str(), Some("window.viewer = true;"));
    assert!(res.header("content-type").is_some_and(|c| c.starts_with("application/javascript")));

    let res = d.dispatch(Request::get("/docs/assets/viewer.css"));
    assert!(res.header("content-type").is_some_and(|c| c.starts_with("text/css")));

    let res = d.dispatch(Request::get("/docs/assets/missing.js"));
    assert_eq!(res.status, 404);
    assert_eq!(error_of(&res).error_type, "resourceNotFound");

    let res = d.dispatch(Request::get("/docs/assets/../secret.txt"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_request_id_generated_and_echoed() {
    let d = service();
    let res = d.dispatch(get("/pets"));
    let generated = res.header(REQUEST_ID_HEADER).unwrap();
    assert!(generated.parse::<RequestId>().is_ok());

    let supplied = RequestId::new().to_string();
    let res = d.dispatch(get("/pets").header(REQUEST_ID_HEADER, supplied.clone()));
    assert_eq!(res.header(REQUEST_ID_HEADER), Some(supplied.as_str()));

    // Not a ULID: replaced.
    let res = d.dispatch(get("/pets").header(REQUEST_ID_HEADER, "abc"));
    assert_ne!(res.header(REQUEST_ID_HEADER), Some("abc"));
}

#[test]
fn test_query_string_ignored_for_routing() {
    let res = service().dispatch(get("/pets?limit=3&sort=name"));
    assert_eq!(res.status, 200);
    let res = service().dispatch(Request::get("/health?verbose=1"));
    assert_eq!(res.status, 200);
}
