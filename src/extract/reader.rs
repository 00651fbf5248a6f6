use super::store::{RequestValues, StoredValue, ValueStore};
use crate::error::{codes, Failure, Fault, HttpError};
use crate::operation::{Operation, ParamDecl, ParamLocation};
use crate::router::ParamVec;
use crate::server::HeaderVec;
use crate::types::UnderlyingType;
use serde_json::{json, Number, Value};

/// Largest magnitude an `f64` holds exactly as an integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Convert and validate one raw parameter string.
///
/// Absent and optional yields `Value::Null`; absent and required is a 400
/// `parameterMissing`. Present values are converted per the declared
/// underlying type and then handed to the type's validator.
///
/// # Errors
///
/// Returns the 400 describing the first conversion or validation problem.
pub fn read_param(
    decl: &ParamDecl,
    location: ParamLocation,
    raw: Option<&str>,
) -> Result<StoredValue, HttpError> {
    let required = decl.required || location == ParamLocation::Url;
    let underlying = decl.named_type.underlying();

    let Some(raw) = raw else {
        if required {
            return Err(HttpError::new(400, codes::PARAMETER_MISSING, "Required parameter missing")
                .with_detail(format!("{location} param '{}' is required", decl.name))
                .with_property("name", json!(decl.name))
                .with_property("location", json!(location.to_string())));
        }
        return Ok(StoredValue {
            value: Value::Null,
            required,
            underlying,
        });
    };

    let value = convert(raw, underlying).map_err(|(error_type, summary)| {
        HttpError::new(400, error_type, summary)
            .with_detail(format!("{location} param '{}' has value '{raw}'", decl.name))
            .with_property("name", json!(decl.name))
            .with_property("location", json!(location.to_string()))
    })?;

    let issues = decl.named_type.validate(&value, &decl.name);
    if !issues.is_empty() {
        return Err(HttpError::new(400, codes::PARAMETER_INVALID, "Parameter did not validate")
            .with_detail(format!(
                "{location} param '{}' is not a valid {}",
                decl.name,
                decl.named_type.name()
            ))
            .with_property("name", json!(decl.name))
            .with_property("location", json!(location.to_string()))
            .with_issues(&issues));
    }

    Ok(StoredValue {
        value,
        required,
        underlying,
    })
}

fn convert(raw: &str, underlying: UnderlyingType) -> Result<Value, (&'static str, &'static str)> {
    match underlying {
        UnderlyingType::String => Ok(Value::String(raw.to_owned())),
        UnderlyingType::Number => parse_number(raw).ok_or((
            codes::PARAMETER_NOT_NUMBER,
            "Parameter cannot be converted to a number",
        )),
        UnderlyingType::Boolean => Ok(Value::Bool(
            raw.eq_ignore_ascii_case("true") || raw == "1",
        )),
        UnderlyingType::Object | UnderlyingType::Array => serde_json::from_str(raw).map_err(|_| {
            (
                codes::PARAMETER_NOT_JSON,
                "Parameter cannot be parsed into JSON",
            )
        }),
    }
}

/// Locale-independent float parse. NaN and infinities are rejected; integral
/// values are stored as integers so integer schemas accept them.
fn parse_number(raw: &str) -> Option<Value> {
    let n: f64 = raw.trim().parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        #[allow(clippy::cast_possible_truncation)]
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

/// Extract every declared url, header and query value of `op`.
///
/// # Errors
///
/// A declared url param the route match did not capture is a [`Fault`]; every
/// other problem is the client's and comes back as an [`HttpError`].
pub fn extract_values(
    op: &Operation,
    url_params: &ParamVec,
    headers: &HeaderVec,
    query: &ParamVec,
) -> Result<RequestValues, Failure> {
    let mut url = ValueStore::new(ParamLocation::Url);
    for decl in &op.url_params {
        let raw = url_params
            .iter()
            .find(|(k, _)| k.as_ref() == decl.name)
            .map(|(_, v)| v.as_str());
        if raw.is_none() {
            return Err(Fault::new(format!(
                "url param '{}' of '{}' was not captured by pattern '{}'",
                decl.name, op.operation_id, op.url_pattern
            ))
            .into());
        }
        url.insert(&decl.name, read_param(decl, ParamLocation::Url, raw)?);
    }

    let mut header_store = ValueStore::new(ParamLocation::Header);
    for decl in &op.header_params {
        let raw = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&decl.name))
            .map(|(_, v)| v.as_str());
        header_store.insert(&decl.name, read_param(decl, ParamLocation::Header, raw)?);
    }

    let mut query_store = ValueStore::new(ParamLocation::Query);
    for decl in &op.query_params {
        let raw = query
            .iter()
            .rfind(|(k, _)| k.as_ref() == decl.name)
            .map(|(_, v)| v.as_str());
        query_store.insert(&decl.name, read_param(decl, ParamLocation::Query, raw)?);
    }

    Ok(RequestValues {
        url,
        headers: header_store,
        query: query_store,
    })
}

/// Render a value for an HTTP header: strings pass through, numbers and
/// booleans are stringified, objects and arrays are JSON, null is empty.
#[must_use]
pub fn header_value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
