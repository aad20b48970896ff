//! JSON merge patches (RFC 7386) for objects without a merge schema.
//!
//! Lists are always replaced as a whole and `null` deletes a field.

use crate::value::{Map, Value};

/// Creates the merge patch that turns `original` into `modified`.
pub fn create_merge_patch(original: &Value, modified: &Value) -> Value {
    match (original, modified) {
        (Value::Map(o), Value::Map(m)) => Value::Map(diff_maps(o, m)),
        _ => modified.clone(),
    }
}

fn diff_maps(original: &Map, modified: &Map) -> Map {
    let mut patch = Map::new();
    for (key, mod_val) in modified.iter() {
        match original.get(key) {
            Some(orig_val) if orig_val == mod_val => {}
            Some(Value::Map(o)) => match mod_val {
                Value::Map(m) => {
                    let child = diff_maps(o, m);
                    if !child.is_empty() {
                        patch.set(key.clone(), Value::Map(child));
                    }
                }
                other => patch.set(key.clone(), other.clone()),
            },
            _ => patch.set(key.clone(), mod_val.clone()),
        }
    }
    for key in original.keys() {
        if !modified.has(key) {
            patch.set(key.clone(), Value::Null);
        }
    }
    patch
}

/// Applies a merge patch to `target`.
pub fn apply_merge_patch(target: &Value, patch: &Value) -> Value {
    let patch = match patch {
        Value::Map(p) => p,
        other => return other.clone(),
    };
    let mut result = match target {
        Value::Map(t) => t.clone(),
        _ => Map::new(),
    };
    for (key, val) in patch.iter() {
        if val.is_null() {
            result.delete(key);
            continue;
        }
        let current = result.delete(key).unwrap_or_default();
        result.set(key.clone(), apply_merge_patch(&current, val));
    }
    Value::Map(result)
}

/// Keeps only the deletions of a patch (`keep_null`), or only its changes
/// and additions. An explicitly empty map is a value, not an empty patch.
fn keep_or_delete_null(patch: &Map, keep_null: bool) -> Map {
    let mut filtered = Map::new();
    for (key, val) in patch.iter() {
        match val {
            Value::Null => {
                if keep_null {
                    filtered.set(key.clone(), Value::Null);
                }
            }
            Value::Map(m) if m.is_empty() => {
                if !keep_null {
                    filtered.set(key.clone(), Value::Map(Map::new()));
                }
            }
            Value::Map(m) => {
                let child = keep_or_delete_null(m, keep_null);
                if !child.is_empty() {
                    filtered.set(key.clone(), Value::Map(child));
                }
            }
            other => {
                if !keep_null {
                    filtered.set(key.clone(), other.clone());
                }
            }
        }
    }
    filtered
}

/// Three-way JSON merge patch: additions and changes come from the
/// `current` → `modified` diff, deletions from the `original` → `modified`
/// diff.
pub fn create_three_way_json_merge_patch(original: Option<&Map>, modified: &Map, current: &Map) -> Map {
    let add_and_change = keep_or_delete_null(&diff_maps(current, modified), false);
    let empty = Map::new();
    let deletions = keep_or_delete_null(&diff_maps(original.unwrap_or(&empty), modified), true);

    match apply_merge_patch(&Value::Map(deletions), &Value::Map(add_and_change)) {
        Value::Map(m) => m,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    fn map(json: &str) -> Map {
        match from_json(json).unwrap() {
            Value::Map(m) => m,
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_create_and_apply_merge_patch() {
        let original = from_json(r#"{"a":1,"b":{"c":[1,2],"d":"x"},"e":true}"#).unwrap();
        let modified = from_json(r#"{"a":1,"b":{"c":[2],"f":{}}}"#).unwrap();

        let patch = create_merge_patch(&original, &modified);
        assert_eq!(
            patch,
            from_json(r#"{"b":{"c":[2],"d":null,"f":{}},"e":null}"#).unwrap()
        );
        assert_eq!(apply_merge_patch(&original, &patch), modified);
    }

    #[test]
    fn test_three_way_json_merge_patch() {
        let original = map(r#"{"data":{"a":"1","b":"2"}}"#);
        let current = map(r#"{"data":{"a":"1","b":"2"},"metadata":{"uid":"123"}}"#);
        let modified = map(r#"{"data":{"a":"3"}}"#);

        let patch = create_three_way_json_merge_patch(Some(&original), &modified, &current);
        assert_eq!(patch, map(r#"{"data":{"a":"3","b":null}}"#));
    }

    #[test]
    fn test_three_way_json_merge_patch_keeps_server_fields() {
        let current = map(r#"{"data":{"a":"1"},"metadata":{"uid":"123"}}"#);
        let modified = map(r#"{"data":{"a":"1"}}"#);
        assert_eq!(
            create_three_way_json_merge_patch(None, &modified, &current),
            Map::new()
        );
    }

    #[test]
    fn test_keep_or_delete_null() {
        let patch = map(r#"{"a":null,"b":{"c":null,"d":1},"e":{},"f":[null]}"#);
        assert_eq!(
            keep_or_delete_null(&patch, false),
            map(r#"{"b":{"d":1},"e":{},"f":[null]}"#)
        );
        assert_eq!(
            keep_or_delete_null(&patch, true),
            map(r#"{"a":null,"b":{"c":null}}"#)
        );
    }
}
