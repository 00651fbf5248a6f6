use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single problem reported by a type validator or by configuration checks.
///
/// `path` locates the offending value (`id`, `body.name`, `GET /tests/:id`),
/// `kind` is a short machine token, `message` is for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
    }
}

/// Render a list of issues one per line, for logs and error messages.
#[must_use]
pub fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compile a JSON schema into a reusable validation closure.
///
/// The closure reports one issue per schema violation, anchored at the path the
/// caller passes in.
///
/// # Errors
///
/// Returns an `InvalidSchema` issue located at `name` if the schema itself
/// does not compile.
pub fn schema_validator(
    name: &str,
    schema: &Value,
) -> Result<impl Fn(&Value, &str) -> Vec<ValidationIssue> + Send + Sync + 'static, ValidationIssue> {
    let compiled = jsonschema::validator_for(schema)
        .map_err(|e| ValidationIssue::new(name, "InvalidSchema", e.to_string()))?;
    Ok(move |value: &Value, path: &str| {
        compiled
            .iter_errors(value)
            .map(|err| ValidationIssue::new(path, "schema", err.to_string()))
            .collect()
    })
}
