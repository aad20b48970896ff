//! Core schema elements and type definitions.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema is a list of named types.
///
/// Schema types are indexed in a map before the first search so this type
/// should be considered immutable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDef>,

    #[serde(skip)]
    type_map: OnceCell<HashMap<String, TypeDef>>,
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Schema::with_types(self.types.clone())
    }
}

/// TypeDef represents a named type in a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDef {
    /// Top level types should be named. Every type must have a unique name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(flatten)]
    pub atom: Atom,
}

/// TypeRef either refers to a named type or declares an inlined type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRef {
    /// Reference to named type in schema.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "namedType")]
    pub named_type: Option<String>,

    /// Inline type definition.
    #[serde(flatten)]
    pub inlined: Box<Atom>,

    /// Overrides the `ElementRelationship` of the referred map or list type.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "elementRelationship"
    )]
    pub element_relationship: Option<ElementRelationship>,
}

/// Atom represents the smallest possible pieces of the type system.
/// Each set field in the Atom represents a possible type for the object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Atom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<List>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Map>,
}

/// Scalar (AKA "primitive") represents a type which has a single value which is
/// either numeric, string, or boolean, or untyped for any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Numeric,
    String,
    Boolean,
    Untyped,
}

/// ElementRelationship describes how the elements of a container type relate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementRelationship {
    /// Lists only: items are merged by key (or by value for scalar items).
    Associative,
    /// The container is replaced as a whole.
    Atomic,
    /// Items have no particular relationship (default behavior for maps).
    #[default]
    Separable,
}

/// Map is a struct-like or free-form map type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Map {
    /// Each struct field appears exactly once in this list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<StructField>,

    /// ElementType is the type of the struct's unknown fields.
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,

    /// ElementRelationship states the relationship between the map's items.
    #[serde(
        default,
        skip_serializing_if = "is_default_element_relationship",
        rename = "elementRelationship"
    )]
    pub element_relationship: ElementRelationship,

    #[serde(skip)]
    field_map: OnceCell<HashMap<String, StructField>>,
}

fn is_default_element_relationship(er: &ElementRelationship) -> bool {
    *er == ElementRelationship::Separable
}

/// StructField pairs a field name with a field type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructField {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, rename = "type")]
    pub field_type: TypeRef,
}

/// List represents a type which contains zero or more elements, all of the
/// same subtype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct List {
    /// ElementType is the type of the list's elements.
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,

    /// ElementRelationship states the relationship between the list's elements.
    #[serde(default, rename = "elementRelationship")]
    pub element_relationship: ElementRelationship,

    /// Keys lists the fields of the element's map type which identify an item
    /// of an associative list (the merge keys).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl Schema {
    /// Creates a schema with the given type definitions.
    pub fn with_types(types: Vec<TypeDef>) -> Self {
        Schema {
            types,
            type_map: OnceCell::new(),
        }
    }

    /// Parses a schema from its YAML form.
    pub fn from_yaml(yaml: &str) -> Result<Schema, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// FindNamedType returns the referenced TypeDef, if it exists.
    pub fn find_named_type(&self, name: &str) -> Option<&TypeDef> {
        let map = self.type_map.get_or_init(|| {
            self.types
                .iter()
                .map(|t| (t.name.clone(), t.clone()))
                .collect()
        });
        map.get(name)
    }

    /// Resolve returns the atom referenced, whether it is inline or named,
    /// with the reference's element relationship override applied.
    /// Returns None if the named type can't be found.
    pub fn resolve(&self, tr: &TypeRef) -> Option<Atom> {
        let mut atom = match tr.named_type {
            Some(ref named) => self.find_named_type(named)?.atom.clone(),
            None => (*tr.inlined).clone(),
        };

        if let Some(relationship) = tr.element_relationship {
            if let Some(ref mut map) = atom.map {
                map.element_relationship = relationship;
            }
            if let Some(ref mut list) = atom.list {
                list.element_relationship = relationship;
            }
        }

        Some(atom)
    }
}

impl Map {
    /// FindField returns the referenced StructField, if it exists.
    pub fn find_field(&self, name: &str) -> Option<&StructField> {
        let map = self.field_map.get_or_init(|| {
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.clone()))
                .collect()
        });
        map.get(name)
    }

    /// Returns the declared type of `name`, falling back to the element type.
    pub fn field_type(&self, name: &str) -> &TypeRef {
        match self.find_field(name) {
            Some(field) => &field.field_type,
            None => &self.element_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_relationship_serialization() {
        assert_eq!(
            serde_json::to_string(&ElementRelationship::Associative).unwrap(),
            "\"associative\""
        );
        assert_eq!(
            serde_json::to_string(&ElementRelationship::Atomic).unwrap(),
            "\"atomic\""
        );
    }

    #[test]
    fn test_schema_from_yaml() {
        let schema = Schema::from_yaml(
            r#"types:
- name: podSpec
  map:
    fields:
    - name: containers
      type:
        list:
          elementType:
            namedType: container
          elementRelationship: associative
          keys: [name]
- name: container
  map:
    elementType:
      scalar: untyped
"#,
        )
        .unwrap();

        let pod_spec = schema.find_named_type("podSpec").unwrap();
        let containers = pod_spec.atom.map.as_ref().unwrap().field_type("containers");
        let list = schema.resolve(containers).unwrap().list.unwrap();
        assert_eq!(list.keys, vec!["name".to_string()]);
        assert_eq!(list.element_relationship, ElementRelationship::Associative);
        assert!(schema.find_named_type("nonexistent").is_none());
    }

    #[test]
    fn test_schema_resolve_override() {
        let schema = Schema::with_types(vec![TypeDef {
            name: "myMap".to_string(),
            atom: Atom {
                map: Some(Map::default()),
                ..Default::default()
            },
        }]);

        let plain = TypeRef {
            named_type: Some("myMap".to_string()),
            ..Default::default()
        };
        assert_eq!(
            schema.resolve(&plain).unwrap().map.unwrap().element_relationship,
            ElementRelationship::Separable
        );

        let overridden = TypeRef {
            named_type: Some("myMap".to_string()),
            element_relationship: Some(ElementRelationship::Atomic),
            ..Default::default()
        };
        assert_eq!(
            schema.resolve(&overridden).unwrap().map.unwrap().element_relationship,
            ElementRelationship::Atomic
        );
    }

    #[test]
    fn test_map_field_type_falls_back_to_element_type() {
        let map = Map {
            fields: vec![StructField {
                name: "spec".to_string(),
                field_type: TypeRef {
                    named_type: Some("podSpec".to_string()),
                    ..Default::default()
                },
            }],
            element_type: TypeRef {
                named_type: Some("__untyped_deduced_".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(map.field_type("spec").named_type.as_deref(), Some("podSpec"));
        assert_eq!(
            map.field_type("other").named_type.as_deref(),
            Some("__untyped_deduced_")
        );
    }
}
