//! # Named Types
//!
//! A [`NamedType`] is the leaf of the declarative model: a globally named schema
//! plus the validator that enforces it. Every parameter, request body and
//! response body of an [`Operation`](crate::operation::Operation) points at one.
//!
//! The router never builds validators itself, it only calls the one each type
//! exposes. Three constructors cover the common cases:
//!
//! - [`NamedType::new`] checks only the underlying kind (`number`, `object`, ...)
//! - [`NamedType::from_schema`] compiles the type's JSON schema with `jsonschema`
//! - [`NamedType::with_validator`] installs an arbitrary function
//!
//! Types are immutable once built and shared behind `Arc`, so the same
//! instance is read concurrently by every request and by the OpenAPI synthesizer.

use crate::config::ConfigError;
use crate::validator::{schema_validator, ValidationIssue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Primitive kind a raw parameter string is converted into before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderlyingType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl UnderlyingType {
    /// JSON schema `type` keyword for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UnderlyingType::String => "string",
            UnderlyingType::Number => "number",
            UnderlyingType::Boolean => "boolean",
            UnderlyingType::Object => "object",
            UnderlyingType::Array => "array",
        }
    }

    /// Whether a JSON value already has this kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            UnderlyingType::String => value.is_string(),
            UnderlyingType::Number => value.is_number(),
            UnderlyingType::Boolean => value.is_boolean(),
            UnderlyingType::Object => value.is_object(),
            UnderlyingType::Array => value.is_array(),
        }
    }
}

impl fmt::Display for UnderlyingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validator signature: `(value, path) -> issues`. An empty vector means valid.
pub type TypeValidator = Arc<dyn Fn(&Value, &str) -> Vec<ValidationIssue> + Send + Sync>;

/// A reusable, named schema/validator pair.
#[derive(Clone)]
pub struct NamedType {
    name: Arc<str>,
    underlying: UnderlyingType,
    schema: Value,
    references: Vec<Arc<NamedType>>,
    validator: TypeValidator,
}

impl fmt::Debug for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedType")
            .field("name", &self.name)
            .field("underlying", &self.underlying)
            .field("schema", &self.schema)
            .field(
                "references",
                &self.references.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl NamedType {
    /// Create a type whose validator only checks the underlying kind.
    pub fn new(name: impl Into<Arc<str>>, underlying: UnderlyingType, schema: Value) -> Self {
        let validator: TypeValidator = Arc::new(move |value: &Value, path: &str| {
            if underlying.matches(value) {
                Vec::new()
            } else {
                vec![ValidationIssue::new(
                    path,
                    "type",
                    format!("expected {underlying}, got {}", json_kind(value)),
                )]
            }
        });
        Self {
            name: name.into(),
            underlying,
            schema,
            references: Vec::new(),
            validator,
        }
    }

    /// Create a type validated by its own JSON schema.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] with one `InvalidSchema` issue if `schema`
    /// does not compile.
    pub fn from_schema(
        name: impl Into<Arc<str>>,
        underlying: UnderlyingType,
        schema: Value,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let validate =
            schema_validator(&name, &schema).map_err(|issue| ConfigError { issues: vec![issue] })?;
        Ok(Self {
            name,
            underlying,
            schema,
            references: Vec::new(),
            validator: Arc::new(validate),
        })
    }

    /// Shorthand for a plain `{"type": "string"}` type.
    pub fn string(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, UnderlyingType::String, json!({"type": "string"}))
    }

    /// Shorthand for a plain `{"type": "number"}` type.
    pub fn number(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, UnderlyingType::Number, json!({"type": "number"}))
    }

    /// Shorthand for a plain `{"type": "boolean"}` type.
    pub fn boolean(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, UnderlyingType::Boolean, json!({"type": "boolean"}))
    }

    /// Replace the validator.
    #[must_use]
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value, &str) -> Vec<ValidationIssue> + Send + Sync + 'static,
    {
        self.validator = Arc::new(validator);
        self
    }

    /// Declare a type this one's schema refers to, so the synthesizer pulls it in.
    #[must_use]
    pub fn references(mut self, other: Arc<NamedType>) -> Self {
        self.references.push(other);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn underlying(&self) -> UnderlyingType {
        self.underlying
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    #[must_use]
    pub fn referenced_types(&self) -> &[Arc<NamedType>] {
        &self.references
    }

    /// Run the validator. Always returns a vector; empty means valid.
    #[must_use]
    pub fn validate(&self, value: &Value, path: &str) -> Vec<ValidationIssue> {
        (self.validator)(value, path)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_validator() {
        let t = NamedType::number("Count");
        assert!(t.validate(&json!(3.5), "count").is_empty());
        let issues = t.validate(&json!("x"), "count");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "expected number, got string");
    }

    #[test]
    fn test_schema_backed_type() {
        let t = NamedType::from_schema(
            "PetId",
            UnderlyingType::Number,
            json!({"type": "number", "minimum": 1}),
        )
        .unwrap();
        assert!(t.validate(&json!(4), "id").is_empty());
        assert_eq!(t.validate(&json!(0), "id").len(), 1);
    }

    #[test]
    fn test_invalid_schema_is_a_config_error() {
        let err = NamedType::from_schema("Broken", UnderlyingType::Number, json!({"type": 12}))
            .err()
            .unwrap();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "Broken");
        assert_eq!(err.issues[0].kind, "InvalidSchema");
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_custom_validator() {
        let t = NamedType::string("Upper").with_validator(|v, path| {
            match v.as_str() {
                Some(s) if s.chars().all(|c| c.is_ascii_uppercase()) => vec![],
                _ => vec![ValidationIssue::new(path, "case", "must be uppercase")],
            }
        });
        assert!(t.validate(&json!("ABC"), "code").is_empty());
        assert_eq!(t.validate(&json!("abc"), "code")[0].kind, "case");
    }

    #[test]
    fn test_underlying_serde_lowercase() {
        let v = serde_json::to_value(UnderlyingType::Array).unwrap();
        assert_eq!(v, json!("array"));
    }
}
