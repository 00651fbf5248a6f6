use crate::types::NamedType;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Prefix of every schema reference the synthesizer emits.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// `$ref` target for a named type.
#[must_use]
pub fn schema_ref(name: &str) -> String {
    format!("{SCHEMA_REF_PREFIX}{name}")
}

/// Component schemas keyed by type name.
///
/// Adding a type also adds everything it references, recursively. A name
/// already present is left alone, so adding the same type any number of
/// times yields the same registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Value>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty` and its references. Returns the `$ref` for `ty`.
    pub fn add(&mut self, ty: &NamedType) -> String {
        let mut pending: Vec<&NamedType> = vec![ty];
        while let Some(next) = pending.pop() {
            if self.schemas.contains_key(next.name()) {
                continue;
            }
            self.schemas.insert(next.name().to_owned(), next.schema().clone());
            pending.extend(next.referenced_types().iter().map(Arc::as_ref));
        }
        schema_ref(ty.name())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    #[must_use]
    pub fn into_schemas(self) -> BTreeMap<String, Value> {
        self.schemas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnderlyingType;
    use serde_json::json;

    fn pet() -> NamedType {
        let tag = Arc::new(NamedType::string("Tag"));
        let owner = Arc::new(
            NamedType::new("Owner", UnderlyingType::Object, json!({"type": "object"}))
                .references(Arc::clone(&tag)),
        );
        NamedType::new(
            "Pet",
            UnderlyingType::Object,
            json!({"type": "object", "properties": {"owner": {"$ref": schema_ref("Owner")}}}),
        )
        .references(owner)
        .references(tag)
    }

    #[test]
    fn test_add_pulls_in_references() {
        let mut reg = SchemaRegistry::new();
        assert_eq!(reg.add(&pet()), "#/components/schemas/Pet");
        assert!(reg.contains("Pet"));
        assert!(reg.contains("Owner"));
        assert!(reg.contains("Tag"));
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_add_is_idempotent() {
        let ty = pet();
        let mut once = SchemaRegistry::new();
        once.add(&ty);
        let mut twice = SchemaRegistry::new();
        twice.add(&ty);
        twice.add(&ty);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_first_registration_wins() {
        let mut reg = SchemaRegistry::new();
        reg.add(&NamedType::string("Id"));
        reg.add(&NamedType::number("Id"));
        assert_eq!(reg.get("Id"), Some(&json!({"type": "string"})));
    }

    #[test]
    fn test_shared_reference_added_once() {
        let leaf = Arc::new(NamedType::string("Leaf"));
        let node = NamedType::new("Node", UnderlyingType::Object, json!({}))
            .references(Arc::clone(&leaf))
            .references(leaf);
        let mut reg = SchemaRegistry::new();
        reg.add(&node);
        assert_eq!(reg.len(), 2);
    }
}
