use crate::error::Fault;
use crate::operation::ParamLocation;
use crate::types::UnderlyingType;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// One extracted parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    /// `Value::Null` when an optional param was absent.
    pub value: Value,
    pub required: bool,
    pub underlying: UnderlyingType,
}

/// Extracted values of one location (url, header or query).
///
/// Accessors enforce that the handler reads a param the way it was declared.
/// Asking for the wrong kind, for `required_*` on an optional param (or
/// `optional_*` on a required one), or for a name that was never declared is
/// a [`Fault`], not a client error.
#[derive(Debug, Clone)]
pub struct ValueStore {
    location: ParamLocation,
    entries: SmallVec<[(Arc<str>, StoredValue); 8]>,
}

impl ValueStore {
    #[must_use]
    pub fn new(location: ParamLocation) -> Self {
        Self {
            location,
            entries: SmallVec::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: &str, value: StoredValue) {
        self.entries.push((Arc::from(name), value));
    }

    #[must_use]
    pub fn location(&self) -> ParamLocation {
        self.location
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The stored value without any declaration checks.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StoredValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_ref())
    }

    fn checked(
        &self,
        name: &str,
        required: bool,
        kind: UnderlyingType,
    ) -> Result<&Value, Fault> {
        let stored = self.get(name).ok_or_else(|| {
            Fault::new(format!("{} param '{name}' is not declared", self.location))
        })?;
        if stored.required != required {
            let (declared, accessed) = if stored.required {
                ("required", "optional")
            } else {
                ("optional", "required")
            };
            return Err(Fault::new(format!(
                "{} param '{name}' is declared {declared} but read with the {accessed} accessor",
                self.location
            )));
        }
        if stored.underlying != kind {
            return Err(Fault::new(format!(
                "{} param '{name}' is declared {} but read as {kind}",
                self.location, stored.underlying
            )));
        }
        Ok(&stored.value)
    }

    fn as_number(&self, name: &str, value: &Value) -> Result<f64, Fault> {
        value.as_f64().ok_or_else(|| {
            Fault::new(format!("{} param '{name}' does not hold a number", self.location))
        })
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn required_number(&self, name: &str) -> Result<f64, Fault> {
        let v = self.checked(name, true, UnderlyingType::Number)?;
        self.as_number(name, v)
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn optional_number(&self, name: &str) -> Result<Option<f64>, Fault> {
        match self.checked(name, false, UnderlyingType::Number)? {
            Value::Null => Ok(None),
            v => self.as_number(name, v).map(Some),
        }
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn required_string(&self, name: &str) -> Result<&str, Fault> {
        self.checked(name, true, UnderlyingType::String)?
            .as_str()
            .ok_or_else(|| Fault::new(format!("{} param '{name}' does not hold a string", self.location)))
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn optional_string(&self, name: &str) -> Result<Option<&str>, Fault> {
        Ok(self.checked(name, false, UnderlyingType::String)?.as_str())
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn required_boolean(&self, name: &str) -> Result<bool, Fault> {
        self.checked(name, true, UnderlyingType::Boolean)?
            .as_bool()
            .ok_or_else(|| Fault::new(format!("{} param '{name}' does not hold a boolean", self.location)))
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn optional_boolean(&self, name: &str) -> Result<Option<bool>, Fault> {
        Ok(self.checked(name, false, UnderlyingType::Boolean)?.as_bool())
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn required_object(&self, name: &str) -> Result<&Value, Fault> {
        self.checked(name, true, UnderlyingType::Object)
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn optional_object(&self, name: &str) -> Result<Option<&Value>, Fault> {
        Ok(Some(self.checked(name, false, UnderlyingType::Object)?).filter(|v| !v.is_null()))
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn required_array(&self, name: &str) -> Result<&Value, Fault> {
        self.checked(name, true, UnderlyingType::Array)
    }

    /// # Errors
    ///
    /// See the type-level docs.
    pub fn optional_array(&self, name: &str) -> Result<Option<&Value>, Fault> {
        Ok(Some(self.checked(name, false, UnderlyingType::Array)?).filter(|v| !v.is_null()))
    }
}

/// All extracted, typed values of one request.
#[derive(Debug, Clone)]
pub struct RequestValues {
    pub url: ValueStore,
    pub headers: ValueStore,
    pub query: ValueStore,
}

impl Default for RequestValues {
    fn default() -> Self {
        Self {
            url: ValueStore::new(ParamLocation::Url),
            headers: ValueStore::new(ParamLocation::Header),
            query: ValueStore::new(ParamLocation::Query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ValueStore {
        let mut s = ValueStore::new(ParamLocation::Query);
        s.insert(
            "limit",
            StoredValue {
                value: json!(10),
                required: true,
                underlying: UnderlyingType::Number,
            },
        );
        s.insert(
            "name",
            StoredValue {
                value: Value::Null,
                required: false,
                underlying: UnderlyingType::String,
            },
        );
        s
    }

    #[test]
    fn test_matching_accessors() {
        let s = store();
        assert_eq!(s.required_number("limit").unwrap(), 10.0);
        assert_eq!(s.optional_string("name").unwrap(), None);
    }

    #[test]
    fn test_required_optional_mismatch_is_fault() {
        let s = store();
        let err = s.optional_number("limit").unwrap_err();
        assert!(err.message().contains("declared required"));
        assert!(s.required_string("name").is_err());
    }

    #[test]
    fn test_kind_mismatch_is_fault() {
        let err = store().required_string("limit").unwrap_err();
        assert!(err.message().contains("declared number but read as string"));
    }

    #[test]
    fn test_undeclared_is_fault() {
        let err = store().required_number("offset").unwrap_err();
        assert!(err.message().contains("not declared"));
    }
}
