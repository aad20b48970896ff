//! Patch meta: merge behavior of each field, read from the schema.

use crate::schema::{builtin_schema, Atom, ElementRelationship, Schema, TypeRef};
use std::sync::Arc;

/// ListStrategy states how the items of a list are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStrategy {
    /// The list is replaced as a whole.
    Replace,
    /// Items are maps identified by the listed merge keys.
    MergeByKeys(Vec<String>),
    /// Items are scalars forming a set.
    MergeSet,
}

/// PatchMeta is a cursor into the schema.
///
/// A meta without a resolved atom stands for an untyped node: maps merge
/// field by field and lists are replaced.
#[derive(Debug, Clone)]
pub struct PatchMeta {
    schema: Arc<Schema>,
    atom: Option<Atom>,
}

impl PatchMeta {
    /// Creates a meta for the named type of `schema`.
    pub fn new(schema: Arc<Schema>, type_name: &str) -> Self {
        let atom = schema.find_named_type(type_name).map(|t| t.atom.clone());
        PatchMeta { schema, atom }
    }

    /// Creates a meta that knows nothing about the document.
    pub fn untyped() -> Self {
        PatchMeta {
            schema: builtin_schema(),
            atom: None,
        }
    }

    fn child(&self, type_ref: &TypeRef) -> PatchMeta {
        PatchMeta {
            schema: Arc::clone(&self.schema),
            atom: self.schema.resolve(type_ref),
        }
    }

    fn untyped_child(&self) -> PatchMeta {
        PatchMeta {
            schema: Arc::clone(&self.schema),
            atom: None,
        }
    }

    /// Returns the meta of a map field.
    pub fn field(&self, name: &str) -> PatchMeta {
        match self.atom.as_ref().and_then(|a| a.map.as_ref()) {
            Some(map) => self.child(map.field_type(name)),
            None => self.untyped_child(),
        }
    }

    /// Returns the meta of the items of a list.
    pub fn item(&self) -> PatchMeta {
        match self.atom.as_ref().and_then(|a| a.list.as_ref()) {
            Some(list) => self.child(&list.element_type),
            None => self.untyped_child(),
        }
    }

    /// Returns how the list at this node is merged.
    pub fn list_strategy(&self) -> ListStrategy {
        match self.atom.as_ref().and_then(|a| a.list.as_ref()) {
            Some(list) if list.element_relationship == ElementRelationship::Associative => {
                if list.keys.is_empty() {
                    ListStrategy::MergeSet
                } else {
                    ListStrategy::MergeByKeys(list.keys.clone())
                }
            }
            _ => ListStrategy::Replace,
        }
    }

    /// Returns true when the map at this node is replaced as a whole.
    pub fn is_atomic_map(&self) -> bool {
        self.atom
            .as_ref()
            .and_then(|a| a.map.as_ref())
            .map(|m| m.element_relationship == ElementRelationship::Atomic)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_list_strategies() {
        let meta = PatchMeta::new(builtin_schema(), "pod");
        let spec = meta.field("spec");

        assert_eq!(
            spec.field("containers").list_strategy(),
            ListStrategy::MergeByKeys(vec!["name".to_string()])
        );
        assert_eq!(
            spec.field("containers").item().field("ports").list_strategy(),
            ListStrategy::MergeByKeys(vec!["containerPort".to_string()])
        );
        assert_eq!(
            spec.field("containers").item().field("args").list_strategy(),
            ListStrategy::Replace
        );
        assert_eq!(spec.field("tolerations").list_strategy(), ListStrategy::Replace);
        assert_eq!(
            meta.field("metadata").field("finalizers").list_strategy(),
            ListStrategy::MergeSet
        );
    }

    #[test]
    fn test_untyped_meta() {
        let meta = PatchMeta::untyped();
        assert_eq!(meta.field("anything").list_strategy(), ListStrategy::Replace);
        assert!(!meta.is_atomic_map());
        assert!(!meta.field("a").item().field("b").is_atomic_map());
    }

    #[test]
    fn test_atomic_map() {
        let meta = PatchMeta::new(builtin_schema(), "__untyped_atomic_");
        assert!(meta.is_atomic_map());
        assert!(!PatchMeta::new(builtin_schema(), "object").is_atomic_map());
    }
}
