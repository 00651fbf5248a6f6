//! Reserved infrastructure endpoints.
//!
//! These are matched on `GET` before any operation and never enter the
//! middleware pipeline.

use super::response::Response;
use crate::config::ServiceConfig;
use crate::error::{Failure, Fault, HttpError};
use crate::openapi::build_spec;
use crate::static_files::StaticFiles;
use minijinja::Environment;
use serde_json::{json, Value};
use std::io;
use tracing::debug;

pub const ROOT_PATH: &str = "/";
pub const HEALTH_PATH: &str = "/health";
pub const OPENAPI_PATH: &str = "/openapi";
pub const DOCS_PATH: &str = "/docs";
pub const DOCS_ASSETS_PREFIX: &str = "/docs/assets/";

/// Template looked up in the assets directory to override the docs page.
pub const DOCS_TEMPLATE_OVERRIDE: &str = "docs.html";

const ROOT_TEMPLATE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>{{ title }}</title></head>
<body>
<h1>{{ title }} <small>{{ version }}</small></h1>
{% if description %}<p>{{ description }}</p>{% endif %}
<ul>
{% for op in operations %}<li><code>{{ op.method }} {{ op.path }}</code> {{ op.name }}</li>
{% endfor %}</ul>
<p><a href="{{ docs_url }}">API documentation</a> | <a href="{{ spec_url }}">OpenAPI</a></p>
</body>
</html>
"#;

const DOCS_TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{{ title }} docs</title>
<link rel="stylesheet" href="{{ assets_url }}viewer.css">
</head>
<body>
<div id="docs" data-spec-url="{{ spec_url }}"></div>
<script src="{{ assets_url }}viewer.js"></script>
</body>
</html>
"#;

/// Whether `path` belongs to a reserved endpoint.
#[must_use]
pub fn is_reserved_path(path: &str) -> bool {
    matches!(path, ROOT_PATH | HEALTH_PATH | OPENAPI_PATH | DOCS_PATH)
        || path.starts_with(DOCS_ASSETS_PREFIX)
}

/// The reserved endpoints of one service.
#[derive(Debug, Clone, Default)]
pub struct ReservedEndpoints {
    assets: Option<StaticFiles>,
}

impl ReservedEndpoints {
    #[must_use]
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            assets: config.settings().docs_assets_dir.clone().map(StaticFiles::new),
        }
    }

    /// Respond to `path` if it is reserved, `None` otherwise.
    pub fn respond(&self, config: &ServiceConfig, path: &str) -> Option<Result<Response, Failure>> {
        let res = match path {
            ROOT_PATH => root_endpoint(config),
            HEALTH_PATH => Ok(health_endpoint(config)),
            OPENAPI_PATH => openapi_endpoint(config),
            DOCS_PATH => docs_endpoint(config, self.assets.as_ref()),
            _ => asset_endpoint(self.assets.as_ref(), path.strip_prefix(DOCS_ASSETS_PREFIX)?),
        };
        Some(res)
    }
}

/// Liveness text including the build identity.
#[must_use]
pub fn health_endpoint(config: &ServiceConfig) -> Response {
    let build = config.build_info();
    Response::text(
        200,
        format!(
            "ok\nservice: {}\ncommit: {}\ntimestamp: {}\n",
            config.settings().title,
            build.commit,
            build.timestamp
        ),
    )
}

/// The synthesized specification as JSON.
///
/// # Errors
///
/// A fault if the document cannot be serialized.
pub fn openapi_endpoint(config: &ServiceConfig) -> Result<Response, Failure> {
    let doc = build_spec(config).to_json()?;
    Ok(Response::json(200, &doc))
}

fn page_context(config: &ServiceConfig) -> Value {
    let settings = config.settings();
    let operations: Vec<Value> = config
        .operations()
        .iter()
        .map(|r| {
            json!({
                "method": r.operation.method.as_str(),
                "path": r.operation.url_pattern,
                "name": r.operation.sort_name(),
            })
        })
        .collect();
    json!({
        "title": settings.title,
        "description": settings.description,
        "version": settings.version,
        "operations": operations,
        "spec_url": OPENAPI_PATH,
        "docs_url": DOCS_PATH,
        "assets_url": DOCS_ASSETS_PREFIX,
    })
}

fn render(template: &str, ctx: &Value) -> Result<String, Fault> {
    Environment::new()
        .render_str(template, ctx)
        .map_err(|e| Fault::new(format!("failed to render page: {e}")))
}

/// Human-readable root page.
///
/// # Errors
///
/// A fault if the page template fails to render.
pub fn root_endpoint(config: &ServiceConfig) -> Result<Response, Failure> {
    let html = render(ROOT_TEMPLATE, &page_context(config))?;
    Ok(Response::html(200, html))
}

/// Documentation viewer page. A `docs.html` in the assets directory
/// replaces the built-in template.
///
/// # Errors
///
/// A fault if rendering fails.
pub fn docs_endpoint(config: &ServiceConfig, assets: Option<&StaticFiles>) -> Result<Response, Failure> {
    let ctx = page_context(config);
    if let Some(assets) = assets.filter(|a| a.contains(DOCS_TEMPLATE_OVERRIDE)) {
        let page = assets
            .load(DOCS_TEMPLATE_OVERRIDE, Some(&ctx))
            .map_err(|e| Fault::new(format!("failed to render {DOCS_TEMPLATE_OVERRIDE}: {e}")))?;
        return Ok(Response::with_body(200, page.content_type, page.bytes));
    }
    Ok(Response::html(200, render(DOCS_TEMPLATE, &ctx)?))
}

/// One file from the docs assets directory.
///
/// # Errors
///
/// The 404 error shape for unknown files or an unconfigured directory, a
/// fault for other read failures.
pub fn asset_endpoint(assets: Option<&StaticFiles>, name: &str) -> Result<Response, Failure> {
    let Some(assets) = assets else {
        return Err(HttpError::not_found()
            .with_detail("docs assets are not configured")
            .into());
    };
    match assets.load(name, None) {
        Ok(asset) => Ok(Response::with_body(200, asset.content_type, asset.bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(asset = %name, "Docs asset not found");
            Err(HttpError::not_found().with_detail(format!("no asset '{name}'")).into())
        }
        Err(e) => Err(Fault::new(format!("failed to read asset '{name}': {e}")).into()),
    }
}
