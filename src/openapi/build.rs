use super::registry::SchemaRegistry;
use crate::config::{ResolvedOperation, ServiceConfig};
use crate::error::Fault;
use crate::operation::{FailureDefinition, Operation, ParamLocation};
use crate::router::to_openapi_path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

pub const OPENAPI_VERSION: &str = "3.0.3";

/// `info.version` when no operation declares an api version.
pub const NO_API_VERSION: &str = "N/A";

pub const API_KEY_SCHEME: &str = "apiKey";
pub const COOKIE_AUTH_SCHEME: &str = "cookieAuth";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    /// Keyed by `{name}`-style path, then lowercase method.
    pub paths: BTreeMap<String, BTreeMap<String, OperationObject>>,
    pub components: Components,
}

impl OpenApiDocument {
    /// # Errors
    ///
    /// A fault if the document cannot be represented as JSON.
    pub fn to_json(&self) -> Result<Value, Fault> {
        serde_json::to_value(self).map_err(|e| Fault::new(format!("failed to serialize specification: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRef {
    #[serde(rename = "$ref")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationObject {
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyObject>,
    pub responses: BTreeMap<String, ResponseObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterObject {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: SchemaRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaTypeObject {
    pub schema: SchemaRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBodyObject {
    pub required: bool,
    pub content: BTreeMap<String, MediaTypeObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: SchemaRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseObject {
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, HeaderObject>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaTypeObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySchemeObject {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(rename = "in")]
    pub location: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    pub schemas: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, SecuritySchemeObject>,
}

fn json_content(reference: String) -> BTreeMap<String, MediaTypeObject> {
    BTreeMap::from([(
        "application/json".to_owned(),
        MediaTypeObject {
            schema: SchemaRef { reference },
        },
    )])
}

/// Synthesize the API description from the service model.
///
/// Operations are emitted in display-name order, which is independent of
/// the declaration order routing uses. When two operations share a method
/// and path, the first in display-name order is kept.
#[must_use]
pub fn build_spec(config: &ServiceConfig) -> OpenApiDocument {
    let mut registry = SchemaRegistry::new();
    let mut paths: BTreeMap<String, BTreeMap<String, OperationObject>> = BTreeMap::new();
    let mut uses_api_key = false;
    let mut uses_cookie = false;

    let mut resolved: Vec<&ResolvedOperation> = config.operations().iter().collect();
    resolved.sort_by(|a, b| a.operation.sort_name().cmp(b.operation.sort_name()));

    for r in resolved {
        let op = &r.operation;
        let mut object = operation_object(op, r.errors.catalogue(), &mut registry);
        if r.uses_auth_api_key() {
            uses_api_key = true;
            object.security.push(BTreeMap::from([(API_KEY_SCHEME.to_owned(), Vec::new())]));
        }
        if r.uses_auth_cookie() {
            uses_cookie = true;
            object.security.push(BTreeMap::from([(COOKIE_AUTH_SCHEME.to_owned(), Vec::new())]));
        }
        let methods = paths.entry(to_openapi_path(&op.url_pattern)).or_default();
        let method = op.method.as_str().to_ascii_lowercase();
        if methods.contains_key(&method) {
            debug!(
                operation_id = %op.operation_id,
                method = %op.method,
                path = %op.url_pattern,
                "Operation shadowed in specification"
            );
            continue;
        }
        methods.insert(method, object);
    }

    for ty in config.types() {
        registry.add(ty);
    }

    let auth = &config.settings().auth;
    let mut security_schemes = BTreeMap::new();
    if uses_api_key {
        security_schemes.insert(
            API_KEY_SCHEME.to_owned(),
            SecuritySchemeObject {
                scheme_type: "apiKey".into(),
                location: "header".into(),
                name: auth.api_key_header.clone(),
            },
        );
    }
    if uses_cookie {
        security_schemes.insert(
            COOKIE_AUTH_SCHEME.to_owned(),
            SecuritySchemeObject {
                scheme_type: "apiKey".into(),
                location: "cookie".into(),
                name: auth.cookie_name.clone(),
            },
        );
    }

    let version = config
        .operations()
        .iter()
        .filter_map(|r| r.operation.api_version.as_deref())
        .max()
        .unwrap_or(NO_API_VERSION)
        .to_owned();

    OpenApiDocument {
        openapi: OPENAPI_VERSION.to_owned(),
        info: Info {
            title: config.settings().title.clone(),
            description: config.settings().description.clone(),
            version,
        },
        paths,
        components: Components {
            schemas: registry.into_schemas(),
            security_schemes,
        },
    }
}

fn operation_object(
    op: &Operation,
    catalogue: &[FailureDefinition],
    registry: &mut SchemaRegistry,
) -> OperationObject {
    let mut parameters = Vec::new();
    for location in [ParamLocation::Url, ParamLocation::Header, ParamLocation::Query] {
        for p in op.params(location) {
            parameters.push(ParameterObject {
                name: p.name.clone(),
                location: location.openapi_in().to_owned(),
                required: p.required || location == ParamLocation::Url,
                deprecated: p.deprecated,
                description: p.description.clone(),
                schema: SchemaRef {
                    reference: registry.add(&p.named_type),
                },
            });
        }
    }

    let request_body = op.request_body.as_ref().map(|ty| RequestBodyObject {
        required: true,
        content: json_content(registry.add(ty)),
    });

    let mut responses = BTreeMap::new();
    let headers = op
        .response_headers
        .iter()
        .map(|h| {
            (
                h.name.clone(),
                HeaderObject {
                    description: h.description.clone(),
                    schema: SchemaRef {
                        reference: registry.add(&h.named_type),
                    },
                },
            )
        })
        .collect();
    responses.insert(
        op.success_code.to_string(),
        ResponseObject {
            description: op.display_name.clone().unwrap_or_else(|| "Success".to_owned()),
            headers,
            content: op
                .response_body
                .as_ref()
                .map(|ty| json_content(registry.add(ty)))
                .unwrap_or_default(),
        },
    );

    let mut by_code: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
    for f in catalogue {
        let summaries = by_code.entry(f.code).or_default();
        if !summaries.contains(&f.summary.as_str()) {
            summaries.push(&f.summary);
        }
    }
    for (code, summaries) in by_code {
        let joined = summaries.join("; ");
        match responses.entry(code.to_string()) {
            // A middleware failure may share the success code.
            Entry::Occupied(mut e) => {
                let description = &mut e.get_mut().description;
                description.push_str("; ");
                description.push_str(&joined);
            }
            Entry::Vacant(e) => {
                e.insert(ResponseObject {
                    description: joined,
                    headers: BTreeMap::new(),
                    content: BTreeMap::new(),
                });
            }
        }
    }

    OperationObject {
        operation_id: op.operation_id.clone(),
        summary: op.display_name.clone(),
        description: op.description.clone(),
        tags: op.tags.clone(),
        deprecated: op.deprecated,
        parameters,
        request_body,
        responses,
        security: Vec::new(),
    }
}
