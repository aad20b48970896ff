//! Last-applied configuration history.
//!
//! The desired configuration that was last submitted is stored on the object
//! itself, as one annotation value. It is the `original` side of the
//! three-way patch calculation.

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::object::ResourceObject;
use crate::prune::prune_json;
use crate::value::{Map, Value};
use tracing::trace;

/// Annotation key under which the last applied configuration is stored.
pub const LAST_APPLIED_CONFIG: &str = "banzaicloud.com/last-applied";

/// Annotator reads and writes the last applied configuration of objects.
#[derive(Debug, Clone)]
pub struct Annotator {
    key: String,
    codec: Codec,
}

impl Default for Annotator {
    fn default() -> Self {
        Annotator::new(LAST_APPLIED_CONFIG, Codec::default())
    }
}

impl Annotator {
    pub fn new(key: impl Into<String>, codec: Codec) -> Self {
        Annotator {
            key: key.into(),
            codec,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Returns the stored original configuration, or None when the object
    /// was never annotated.
    pub fn get_original_configuration(&self, obj: &ResourceObject) -> Result<Option<Vec<u8>>> {
        let annots = match obj.annotations()? {
            Some(annots) => annots,
            None => return Ok(None),
        };
        match annots.get(&self.key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_bytes().to_vec())),
            Some(other) => Err(Error::annotation(format!(
                "annotation {} is a {}, not a string",
                self.key,
                other.type_name()
            ))),
        }
    }

    /// Stores `original` verbatim as the annotation value. Empty input is a
    /// no-op.
    pub fn set_original_configuration(&self, obj: &mut ResourceObject, original: &[u8]) -> Result<()> {
        if original.is_empty() {
            return Ok(());
        }

        let mut annots = obj.annotations()?.cloned().unwrap_or_default();
        annots.set(
            self.key.clone(),
            Value::String(String::from_utf8_lossy(original).into_owned()),
        );
        obj.set_annotations(Some(annots))
    }

    /// Serializes the object without its annotation. When `annotate` is set
    /// the serialization is embedded as the annotation and the object is
    /// serialized once more.
    ///
    /// The object itself is left untouched.
    pub fn get_modified_configuration(&self, obj: &ResourceObject, annotate: bool) -> Result<Vec<u8>> {
        let mut scratch = obj.clone();
        let mut annots: Map = scratch.annotations()?.cloned().unwrap_or_default();
        annots.delete(&self.key);
        scratch.set_annotations(Some(annots.clone()))?;

        let mut modified = self.codec.marshal(&scratch)?;
        if annotate {
            annots.set(
                self.key.clone(),
                Value::String(String::from_utf8_lossy(&modified).into_owned()),
            );
            scratch.set_annotations(Some(annots))?;
            modified = self.codec.marshal(&scratch)?;
        }
        Ok(modified)
    }

    /// Records the object's current content as its last applied
    /// configuration. Call this on the desired object right before it is
    /// submitted.
    pub fn set_last_applied_annotation(&self, obj: &mut ResourceObject) -> Result<()> {
        let modified = self.get_modified_configuration(obj, false)?;
        let (pruned, _) = prune_json(&modified)?;
        trace!(object = %obj.display_name(), key = %self.key, "setting last applied annotation");
        self.set_original_configuration(obj, &pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn config_map() -> ResourceObject {
        ResourceObject::from_yaml(
            r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
  namespace: default
  labels:
    app: web
data:
  mode: fast
  empty: ""
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_unannotated_object_has_no_original() {
        let annotator = Annotator::default();
        assert_eq!(annotator.get_original_configuration(&config_map()).unwrap(), None);

        let bare = ResourceObject::from_json(r#"{"kind":"ConfigMap"}"#).unwrap();
        assert_eq!(annotator.get_original_configuration(&bare).unwrap(), None);
    }

    #[test]
    fn test_metadata_must_be_accessible() {
        let annotator = Annotator::default();
        let broken = ResourceObject::from_json(r#"{"metadata":"nope"}"#).unwrap();
        assert!(matches!(
            annotator.get_original_configuration(&broken),
            Err(Error::Annotation { .. })
        ));
    }

    #[test]
    fn test_non_string_original_is_an_error() {
        let annotator = Annotator::default();
        let obj = ResourceObject::from_json(&format!(
            r#"{{"kind":"ConfigMap","metadata":{{"annotations":{{"{}":{{"a":1}}}}}}}}"#,
            LAST_APPLIED_CONFIG
        ))
        .unwrap();
        assert!(matches!(
            annotator.get_original_configuration(&obj),
            Err(Error::Annotation { .. })
        ));
    }

    #[test]
    fn test_set_original_configuration() {
        let annotator = Annotator::default();
        let mut obj = config_map();

        annotator.set_original_configuration(&mut obj, b"").unwrap();
        assert_eq!(obj, config_map());

        annotator.set_original_configuration(&mut obj, br#"{"a":1}"#).unwrap();
        assert_eq!(
            annotator.get_original_configuration(&obj).unwrap(),
            Some(br#"{"a":1}"#.to_vec())
        );
    }

    #[test]
    fn test_get_modified_configuration_excludes_annotation() {
        let annotator = Annotator::default();
        let mut obj = config_map();
        annotator.set_original_configuration(&mut obj, b"{}").unwrap();
        let before = obj.clone();

        let modified = annotator.get_modified_configuration(&obj, false).unwrap();
        let text = String::from_utf8(modified).unwrap();
        assert!(!text.contains(LAST_APPLIED_CONFIG));
        // The annotation map became empty, so it is not serialized at all.
        assert!(!text.contains("annotations"));
        assert_eq!(obj, before);
    }

    #[test]
    fn test_get_modified_configuration_with_annotate() {
        let annotator = Annotator::default();
        let obj = config_map();

        let plain = annotator.get_modified_configuration(&obj, false).unwrap();
        let annotated = annotator.get_modified_configuration(&obj, true).unwrap();
        let annotated = ResourceObject::from_slice(&annotated).unwrap();

        assert_eq!(
            annotator.get_original_configuration(&annotated).unwrap(),
            Some(plain)
        );
    }

    #[test]
    fn test_set_last_applied_annotation_round_trip() {
        let annotator = Annotator::default();
        let mut obj = config_map();
        annotator.set_last_applied_annotation(&mut obj).unwrap();

        let original = annotator.get_original_configuration(&obj).unwrap().unwrap();
        let original = String::from_utf8(original).unwrap();
        assert_eq!(
            original,
            r#"{"apiVersion":"v1","data":{"mode":"fast"},"kind":"ConfigMap","metadata":{"labels":{"app":"web"},"name":"settings","namespace":"default"}}"#
        );

        // Annotating again does not nest the previous annotation.
        annotator.set_last_applied_annotation(&mut obj).unwrap();
        let again = annotator.get_original_configuration(&obj).unwrap().unwrap();
        assert_eq!(String::from_utf8(again).unwrap(), original);
    }

    #[test]
    fn test_custom_key() {
        let annotator = Annotator::new("example.com/applied", Codec::default());
        let mut obj = config_map();
        annotator.set_last_applied_annotation(&mut obj).unwrap();
        assert!(obj
            .value()
            .get_path(&["metadata", "annotations", "example.com/applied"])
            .is_some());
        assert_eq!(
            Annotator::default().get_original_configuration(&obj).unwrap(),
            None
        );
    }
}
