//! Document codec: canonical JSON for resource objects.
//!
//! Maps are key-sorted, so two equal documents always serialize to the same
//! bytes. Int-or-string fields are canonicalized on the way out: an empty
//! union (`0`, `""` or `"0"`) is written as `null`, so the pruner treats it
//! as unset on both sides of a comparison.

use crate::error::{Error, Result};
use crate::object::ResourceObject;
use crate::value::{self, Map, Value};
use serde::{Deserialize, Serialize};

/// Field path suffixes that hold int-or-string values in the core kinds.
pub const DEFAULT_INT_OR_STRING_FIELDS: &[&str] = &[
    "ports.targetPort",
    "httpGet.port",
    "tcpSocket.port",
    "grpc.port",
    "rollingUpdate.maxSurge",
    "rollingUpdate.maxUnavailable",
    "spec.minAvailable",
    "spec.maxUnavailable",
    "backend.servicePort",
];

/// CodecConfig lists the int-or-string fields of the documents.
///
/// Each entry is a dotted suffix of field names. List positions are not part
/// of the path, so `ports.targetPort` matches `spec.ports[3].targetPort`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodecConfig {
    pub int_or_string_fields: Vec<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            int_or_string_fields: DEFAULT_INT_OR_STRING_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Codec marshals resource objects to canonical JSON bytes and back.
#[derive(Debug, Clone)]
pub struct Codec {
    unions: Vec<Vec<String>>,
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new(&CodecConfig::default())
    }
}

impl Codec {
    pub fn new(config: &CodecConfig) -> Self {
        let unions = config
            .int_or_string_fields
            .iter()
            .map(|p| {
                p.split('.')
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|p| !p.is_empty())
            .collect();
        Codec { unions }
    }

    /// Marshals an object to canonical JSON.
    pub fn marshal(&self, obj: &ResourceObject) -> Result<Vec<u8>> {
        self.marshal_value(obj.value())
    }

    /// Marshals any document tree to canonical JSON.
    pub fn marshal_value(&self, value: &Value) -> Result<Vec<u8>> {
        let mut canonical = value.clone();
        if !self.unions.is_empty() {
            let mut path = Vec::new();
            self.canonicalize(&mut canonical, &mut path);
        }
        value::to_vec(&canonical).map_err(|e| Error::encoding("failed to encode object", e))
    }

    /// Unmarshals JSON bytes into a document tree.
    pub fn unmarshal(&self, bytes: &[u8]) -> Result<Value> {
        value::from_slice(bytes).map_err(|e| Error::encoding("failed to decode object", e))
    }

    /// Unmarshals JSON bytes that must hold an object at the top level.
    pub fn unmarshal_map(&self, bytes: &[u8]) -> Result<Map> {
        serde_json::from_slice(bytes).map_err(|e| Error::encoding("failed to decode object", e))
    }

    fn canonicalize(&self, value: &mut Value, path: &mut Vec<String>) {
        match value {
            Value::Map(map) => {
                for (name, child) in map.fields.iter_mut() {
                    path.push(name.clone());
                    if self.is_union(path) {
                        if is_empty_union(child) {
                            *child = Value::Null;
                        }
                    } else {
                        self.canonicalize(child, path);
                    }
                    path.pop();
                }
            }
            Value::List(items) => {
                for item in items.iter_mut() {
                    self.canonicalize(item, path);
                }
            }
            _ => {}
        }
    }

    fn is_union(&self, path: &[String]) -> bool {
        self.unions.iter().any(|suffix| path.ends_with(suffix))
    }
}

fn is_empty_union(value: &Value) -> bool {
    match value {
        Value::Int(0) => true,
        Value::Float(f) => *f == 0.0,
        Value::String(s) => s.is_empty() || s == "0",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn marshal(json: &str) -> String {
        let obj = ResourceObject::from_json(json).unwrap();
        String::from_utf8(Codec::default().marshal(&obj).unwrap()).unwrap()
    }

    #[test]
    fn test_marshal_is_canonical() {
        assert_eq!(
            marshal(r#"{ "spec": {"b": 1, "a": [true, null]}, "kind": "Pod" }"#),
            r#"{"kind":"Pod","spec":{"a":[true,null],"b":1}}"#
        );
    }

    #[test]
    fn test_empty_unions_become_null() {
        assert_eq!(
            marshal(r#"{"spec":{"ports":[{"port":80,"targetPort":0},{"port":81,"targetPort":"0"},{"port":82,"targetPort":""}]}}"#),
            r#"{"spec":{"ports":[{"port":80,"targetPort":null},{"port":81,"targetPort":null},{"port":82,"targetPort":null}]}}"#
        );
    }

    #[test]
    fn test_non_empty_unions_are_unchanged() {
        assert_eq!(
            marshal(r#"{"spec":{"ports":[{"port":80,"targetPort":8080},{"port":81,"targetPort":"http"},{"port":82,"targetPort":"5"}]}}"#),
            r#"{"spec":{"ports":[{"port":80,"targetPort":8080},{"port":81,"targetPort":"http"},{"port":82,"targetPort":"5"}]}}"#
        );
    }

    #[test]
    fn test_unlisted_zero_fields_are_kept() {
        assert_eq!(
            marshal(r#"{"spec":{"replicas":0,"minReadySeconds":0,"minAvailable":0}}"#),
            r#"{"spec":{"minAvailable":null,"minReadySeconds":0,"replicas":0}}"#
        );
    }

    #[test]
    fn test_custom_union_fields() {
        let codec = Codec::new(&CodecConfig {
            int_or_string_fields: vec!["spec.threshold".to_string()],
        });
        let obj = ResourceObject::from_json(r#"{"spec":{"threshold":"","ports":[{"targetPort":0}]}}"#).unwrap();
        assert_eq!(
            String::from_utf8(codec.marshal(&obj).unwrap()).unwrap(),
            r#"{"spec":{"ports":[{"targetPort":0}],"threshold":null}}"#
        );
    }

    #[test]
    fn test_unmarshal_errors() {
        let codec = Codec::default();
        assert!(matches!(codec.unmarshal(b"{"), Err(Error::Encoding { .. })));
        assert!(matches!(codec.unmarshal_map(b"[1]"), Err(Error::Encoding { .. })));
        assert_eq!(codec.unmarshal_map(b"{}").unwrap(), Map::new());
    }
}
