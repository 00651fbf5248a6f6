//! Request-scoped shared state.
//!
//! A [`Context`] is created fresh for every dispatch and handed by `&mut` to
//! each middleware and then to the handler. It dies with the request.
//!
//! Two ways to store things, both collision-free:
//!
//! - typed slots keyed by Rust type (`ctx.insert(Authenticated { .. })`), the
//!   preferred form for anything a middleware hands downstream;
//! - a namespaced JSON map (`ctx.set("audit", "actor", json!("bob"))`) for
//!   loosely structured data.

use crate::error::{ErrorFactory, HttpError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// ULID request identifier, echoed as `x-request-id`.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse a caller-supplied id when it is a valid ULID.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| serde::de::Error::custom("invalid request id"))
    }
}

/// Mutable per-request store shared by the pipeline and the handler.
pub struct Context {
    request_id: RequestId,
    operation_id: String,
    errors: ErrorFactory,
    typed: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    values: BTreeMap<String, BTreeMap<String, Value>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("operation_id", &self.operation_id)
            .field("typed_slots", &self.typed.len())
            .field("values", &self.values)
            .finish()
    }
}

impl Context {
    pub fn new(request_id: RequestId, operation_id: impl Into<String>, errors: ErrorFactory) -> Self {
        Self {
            request_id,
            operation_id: operation_id.into(),
            errors,
            typed: HashMap::new(),
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Build a declared failure of the current operation or its middleware.
    #[must_use]
    pub fn error(&self, failure_type: &str) -> HttpError {
        self.errors.create(failure_type)
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorFactory {
        &self.errors
    }

    /// Store a value in its type's slot, returning the previous one.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.typed
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|b| *b)
    }

    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.typed
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.typed
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.typed
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Set `key` inside `namespace`.
    pub fn set(&mut self, namespace: &str, key: &str, value: Value) {
        self.values
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
    }

    #[must_use]
    pub fn value(&self, namespace: &str, key: &str) -> Option<&Value> {
        self.values.get(namespace).and_then(|ns| ns.get(key))
    }

    /// Every key of one namespace.
    #[must_use]
    pub fn namespace(&self, namespace: &str) -> Option<&BTreeMap<String, Value>> {
        self.values.get(namespace)
    }
}
