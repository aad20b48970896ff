//! Null pruning of documents.
//!
//! Unset fields are spelled in many ways: missing, `null`, `""` or an object
//! whose every field is unset. Pruning collapses them so that a desired
//! object and a live object compare equal when they only differ in how they
//! spell "unset".
//!
//! Map entries and list elements follow different rules:
//!
//! | value                | map entry                      | list element |
//! |----------------------|--------------------------------|--------------|
//! | `null`               | dropped                        | dropped      |
//! | `""`                 | dropped                        | kept         |
//! | bool, number         | kept                           | kept         |
//! | list                 | kept, elements pruned          | kept, pruned |
//! | `{}`                 | kept                           | kept         |
//! | non-empty map        | pruned, dropped if now empty   | pruned, kept |

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::object::ResourceObject;
use crate::value::{self, Map, Value};

/// Prunes any document tree.
pub fn prune(value: &Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(prune_map(map)),
        Value::List(items) => Value::List(prune_list(items)),
        other => other.clone(),
    }
}

/// Prunes the entries of a map.
pub fn prune_map(map: &Map) -> Map {
    let mut pruned = Map::new();
    for (key, val) in map.iter() {
        match val {
            Value::Null => {}
            Value::String(s) if s.is_empty() => {}
            Value::Map(child) if child.is_empty() => {
                pruned.set(key.clone(), Value::Map(Map::new()));
            }
            Value::Map(child) => {
                let child = prune_map(child);
                if !child.is_empty() {
                    pruned.set(key.clone(), Value::Map(child));
                }
            }
            Value::List(items) => {
                pruned.set(key.clone(), Value::List(prune_list(items)));
            }
            other => {
                pruned.set(key.clone(), other.clone());
            }
        }
    }
    pruned
}

fn prune_list(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            Value::Map(m) => Value::Map(prune_map(m)),
            Value::List(l) => Value::List(prune_list(l)),
            other => other.clone(),
        })
        .collect()
}

/// Prunes a serialized JSON object and returns both the canonical bytes and
/// the pruned map.
pub fn prune_json(bytes: &[u8]) -> Result<(Vec<u8>, Map)> {
    let map: Map =
        serde_json::from_slice(bytes).map_err(|e| Error::encoding("could not unmarshal json", e))?;
    let pruned = prune_map(&map);
    let out = value::to_vec(&Value::Map(pruned.clone()))
        .map_err(|e| Error::encoding("could not marshal pruned json", e))?;
    Ok((out, pruned))
}

/// Marshals an object through `codec` and prunes the result, the way both
/// sides are prepared before a comparison.
pub fn prune_object(codec: &Codec, obj: &ResourceObject) -> Result<Vec<u8>> {
    let data = codec.marshal(obj)?;
    let (pruned, _) = prune_json(&data)?;
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    fn prune_str(json: &str) -> String {
        let (out, _) = prune_json(json.as_bytes()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_map_entry_rules() {
        assert_eq!(
            prune_str(
                r#"{"null":null,"empty":"","false":false,"zero":0,"list":[],"obj":{},"nested":{"a":null,"b":""},"kept":{"a":null,"b":"x"}}"#
            ),
            r#"{"false":false,"kept":{"b":"x"},"list":[],"obj":{},"zero":0}"#
        );
    }

    #[test]
    fn test_list_element_rules() {
        assert_eq!(
            prune_str(r#"{"items":[null,"",0,{"a":null},{},[null,1]]}"#),
            r#"{"items":["",0,{},{},[1]]}"#
        );
    }

    #[test]
    fn test_prune_is_idempotent() {
        let docs = [
            r#"{"metadata":{"labels":{},"annotations":{"a":null}},"spec":{"containers":[{"name":"app","env":[],"resources":{"limits":{"cpu":""}}}]}}"#,
            r#"{"a":{"b":{"c":{"d":null}}},"e":[[null],[{"f":""}]]}"#,
            r#"{"status":{},"spec":{"selector":null,"replicas":0,"paused":false}}"#,
        ];
        for doc in docs {
            let once = prune(&from_json(doc).unwrap());
            let twice = prune(&once);
            assert_eq!(once, twice, "pruning is not idempotent for {}", doc);
        }
    }

    #[test]
    fn test_deeply_unset_map_disappears() {
        assert_eq!(prune_str(r#"{"a":{"b":{"c":null}},"d":1}"#), r#"{"d":1}"#);
    }

    #[test]
    fn test_prune_json_requires_object() {
        assert!(matches!(prune_json(b"[1,2]"), Err(Error::Encoding { .. })));
        assert!(prune_json(b"not json").is_err());
    }

    #[test]
    fn test_prune_object_canonicalizes_unions() {
        let obj = ResourceObject::from_json(
            r#"{"kind":"Service","metadata":{"name":"s","labels":{}},"spec":{"ports":[{"port":80,"targetPort":0,"name":""}]}}"#,
        )
        .unwrap();
        let pruned = prune_object(&Codec::default(), &obj).unwrap();
        assert_eq!(
            String::from_utf8(pruned).unwrap(),
            r#"{"kind":"Service","metadata":{"labels":{},"name":"s"},"spec":{"ports":[{"port":80}]}}"#
        );
    }
}
