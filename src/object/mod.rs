//! Resource objects and their metadata accessors.
//!
//! A [`ResourceObject`] is a document tree whose root is a map with the
//! `metadata`, `spec` and `status` zones. The accessors here play the role of
//! a metadata accessor: they read type meta and identity, and expose the
//! annotation map for reading and writing.

mod kind;

pub use kind::{api_group, Kind};

use crate::error::{Error, Result};
use crate::value::{self, Map, Value};
use std::fmt;

/// ResourceObject is a single managed object, live or desired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceObject {
    value: Value,
}

impl ResourceObject {
    pub fn new(value: Value) -> Self {
        ResourceObject { value }
    }

    /// Parses an object from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        value::from_json(json)
            .map(ResourceObject::new)
            .map_err(|e| Error::encoding("failed to decode object", e))
    }

    /// Parses an object from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        value::from_slice(bytes)
            .map(ResourceObject::new)
            .map_err(|e| Error::encoding("failed to decode object", e))
    }

    /// Parses an object from YAML. JSON input is accepted as well.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        value::from_yaml(yaml)
            .map(ResourceObject::new)
            .map_err(|e| Error::yaml("failed to decode object", e))
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn api_version(&self) -> &str {
        self.str_field(&["apiVersion"])
    }

    pub fn kind(&self) -> &str {
        self.str_field(&["kind"])
    }

    /// Returns the dispatch kind of the object.
    pub fn type_kind(&self) -> Kind {
        Kind::from_type_meta(self.api_version(), self.kind())
    }

    /// Returns `metadata.name`, or `metadata.generateName` for objects that
    /// were not created yet.
    pub fn name(&self) -> &str {
        match self.str_field(&["metadata", "name"]) {
            "" => self.str_field(&["metadata", "generateName"]),
            name => name,
        }
    }

    pub fn namespace(&self) -> &str {
        self.str_field(&["metadata", "namespace"])
    }

    /// Returns `namespace/name` (or just the name for cluster scoped objects),
    /// used to identify the object in errors and logs.
    pub fn display_name(&self) -> String {
        match self.namespace() {
            "" => self.name().to_string(),
            ns => format!("{}/{}", ns, self.name()),
        }
    }

    /// Returns the metadata map, or None when the object has none yet.
    ///
    /// Fails when the object root or its metadata is not a map.
    pub fn metadata(&self) -> Result<Option<&Map>> {
        let root = self
            .value
            .as_map()
            .ok_or_else(|| Error::annotation(format!("object is a {}, not a map", self.value.type_name())))?;
        match root.get("metadata") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Map(m)) => Ok(Some(m)),
            Some(other) => Err(Error::annotation(format!(
                "metadata is a {}, not a map",
                other.type_name()
            ))),
        }
    }

    /// Returns the annotation map, or None when the object has no annotations.
    pub fn annotations(&self) -> Result<Option<&Map>> {
        let metadata = match self.metadata()? {
            Some(m) => m,
            None => return Ok(None),
        };
        match metadata.get("annotations") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Map(m)) => Ok(Some(m)),
            Some(other) => Err(Error::annotation(format!(
                "annotations is a {}, not a map",
                other.type_name()
            ))),
        }
    }

    /// Replaces the annotation map. `None` or an empty map removes the
    /// annotations field entirely.
    pub fn set_annotations(&mut self, annotations: Option<Map>) -> Result<()> {
        // Validate the shape before touching anything.
        self.annotations()?;
        let root = self
            .value
            .as_map_mut()
            .ok_or_else(|| Error::annotation("object is not a map"))?;

        match annotations {
            Some(annots) if !annots.is_empty() => {
                root.map_entry("metadata").set("annotations", Value::Map(annots));
            }
            _ => {
                if let Some(Value::Map(metadata)) = root.get_mut("metadata") {
                    metadata.delete("annotations");
                }
            }
        }
        Ok(())
    }

    fn str_field(&self, path: &[&str]) -> &str {
        self.value
            .get_path(path)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl From<Value> for ResourceObject {
    fn from(value: Value) -> Self {
        ResourceObject::new(value)
    }
}

impl fmt::Display for ResourceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pod() -> ResourceObject {
        ResourceObject::from_yaml(
            r#"apiVersion: v1
kind: Pod
metadata:
  name: web
  namespace: default
  annotations:
    team: platform
spec:
  containers:
  - name: app
    image: nginx
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_type_meta_and_identity() {
        let obj = pod();
        assert_eq!(obj.api_version(), "v1");
        assert_eq!(obj.kind(), "Pod");
        assert_eq!(obj.type_kind(), Kind::Pod);
        assert_eq!(obj.name(), "web");
        assert_eq!(obj.namespace(), "default");
        assert_eq!(obj.display_name(), "default/web");
        assert_eq!(format!("{}", obj), "Pod default/web");
    }

    #[test]
    fn test_generate_name_is_used_before_creation() {
        let obj = ResourceObject::from_json(r#"{"metadata":{"generateName":"job-"}}"#).unwrap();
        assert_eq!(obj.name(), "job-");
        assert_eq!(obj.display_name(), "job-");
    }

    #[test]
    fn test_annotations() {
        let mut obj = pod();
        let annots = obj.annotations().unwrap().unwrap();
        assert_eq!(annots.get("team"), Some(&Value::from("platform")));

        obj.set_annotations(None).unwrap();
        assert!(obj.annotations().unwrap().is_none());
        assert!(obj.value().get_path(&["metadata", "annotations"]).is_none());

        let mut annots = Map::new();
        annots.set("owner", "me".into());
        obj.set_annotations(Some(annots)).unwrap();
        assert_eq!(
            obj.value().get_path(&["metadata", "annotations", "owner"]),
            Some(&Value::from("me"))
        );
    }

    #[test]
    fn test_set_annotations_creates_metadata() {
        let mut obj = ResourceObject::from_json(r#"{"kind":"ConfigMap"}"#).unwrap();
        assert!(obj.metadata().unwrap().is_none());

        let mut annots = Map::new();
        annots.set("a", "b".into());
        obj.set_annotations(Some(annots)).unwrap();
        assert_eq!(
            obj.value().get_path(&["metadata", "annotations", "a"]),
            Some(&Value::from("b"))
        );
    }

    #[test]
    fn test_metadata_accessor_errors() {
        let obj = ResourceObject::from_json(r#"[1, 2]"#).unwrap();
        assert!(matches!(obj.metadata(), Err(Error::Annotation { .. })));

        let obj = ResourceObject::from_json(r#"{"metadata": "broken"}"#).unwrap();
        assert!(matches!(obj.annotations(), Err(Error::Annotation { .. })));

        let obj = ResourceObject::from_json(r#"{"metadata": {"annotations": [1]}}"#).unwrap();
        assert!(obj.annotations().is_err());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            ResourceObject::from_json("{not json"),
            Err(Error::Encoding { .. })
        ));
        assert!(matches!(
            ResourceObject::from_yaml("a: [1"),
            Err(Error::Yaml { .. })
        ));
    }
}
