//! Strategic merge patch application.

use super::meta::{ListStrategy, PatchMeta};
use super::{
    merge_key, DELETE_FROM_PRIMITIVE_LIST_PREFIX, DIRECTIVE_MARKER, PATCH_DIRECTIVE,
    PATCH_DIRECTIVE_DELETE, PATCH_DIRECTIVE_REPLACE, SET_ELEMENT_ORDER_PREFIX,
};
use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Applies a strategic merge patch to `document`.
pub fn strategic_merge_patch(document: &Map, patch: &Map, meta: &PatchMeta) -> Result<Map> {
    merge_map(document.clone(), patch, meta)
}

fn patch_directive(map: &Map) -> Option<&str> {
    map.get(PATCH_DIRECTIVE).and_then(Value::as_str)
}

fn merge_map(mut original: Map, patch: &Map, meta: &PatchMeta) -> Result<Map> {
    match patch_directive(patch) {
        Some(PATCH_DIRECTIVE_REPLACE) => {
            let mut replaced = patch.clone();
            replaced.delete(PATCH_DIRECTIVE);
            return Ok(replaced);
        }
        Some(PATCH_DIRECTIVE_DELETE) => return Ok(Map::new()),
        Some(other) => return Err(Error::merge(format!("unknown patch type: {}", other))),
        None => {}
    }

    for (key, val) in patch.iter() {
        if let Some(field) = key.strip_prefix(DELETE_FROM_PRIMITIVE_LIST_PREFIX) {
            let field = field.trim_start_matches('/');
            let removals = val.as_list().ok_or_else(|| {
                Error::merge(format!("{} must hold a list, got a {}", key, val.type_name()))
            })?;
            if let Some(Value::List(items)) = original.get_mut(field) {
                items.retain(|item| !removals.contains(item));
            }
        }
    }

    for (key, val) in patch.iter() {
        if key.starts_with(DIRECTIVE_MARKER) {
            continue;
        }
        if val.is_null() {
            original.delete(key);
            continue;
        }
        if let Value::Map(p) = val {
            if patch_directive(p) == Some(PATCH_DIRECTIVE_DELETE) {
                original.delete(key);
                continue;
            }
        }

        let field_meta = meta.field(key);
        let merged = match (original.delete(key), val) {
            (Some(Value::Map(o)), Value::Map(p)) if !field_meta.is_atomic_map() => {
                Value::Map(merge_map(o, p, &field_meta)?)
            }
            (None, Value::Map(p)) => Value::Map(merge_map(Map::new(), p, &field_meta)?),
            (Some(Value::List(o)), Value::List(p)) => Value::List(merge_list(o, p, &field_meta)?),
            (None, Value::List(p)) => Value::List(merge_list(Vec::new(), p, &field_meta)?),
            (_, v) => v.clone(),
        };
        original.set(key.clone(), merged);
    }

    for (key, val) in patch.iter() {
        if let Some(field) = key.strip_prefix(SET_ELEMENT_ORDER_PREFIX) {
            let field = field.trim_start_matches('/');
            let order = val.as_list().ok_or_else(|| {
                Error::merge(format!("{} must hold a list, got a {}", key, val.type_name()))
            })?;
            let strategy = meta.field(field).list_strategy();
            if let Some(Value::List(items)) = original.get_mut(field) {
                let reordered = reorder(std::mem::take(items), order, &strategy);
                *items = reordered;
            }
        }
    }

    Ok(original)
}

fn merge_list(original: Vec<Value>, patch: &[Value], meta: &PatchMeta) -> Result<Vec<Value>> {
    match meta.list_strategy() {
        ListStrategy::Replace => Ok(patch.to_vec()),
        ListStrategy::MergeSet => {
            let mut merged = original;
            for item in patch {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            Ok(merged)
        }
        ListStrategy::MergeByKeys(keys) => {
            let replace = patch.iter().any(|item| {
                item.as_map().and_then(patch_directive) == Some(PATCH_DIRECTIVE_REPLACE)
            });
            if replace {
                return Ok(patch
                    .iter()
                    .filter(|item| item.as_map().and_then(patch_directive).is_none())
                    .cloned()
                    .collect());
            }

            let item_meta = meta.item();
            let mut merged = original;
            for item in patch {
                let p = item.as_map().ok_or_else(|| {
                    Error::merge(format!(
                        "patch item is a {}, expected a map with merge keys {:?}",
                        item.type_name(),
                        keys
                    ))
                })?;
                let key = merge_key(p, &keys)?;
                let matches_key = |v: &Value| {
                    v.as_map()
                        .and_then(|m| merge_key(m, &keys).ok())
                        .map_or(false, |k| k == key)
                };

                if patch_directive(p) == Some(PATCH_DIRECTIVE_DELETE) {
                    merged.retain(|v| !matches_key(v));
                    continue;
                }

                match merged.iter().position(|v| matches_key(v)) {
                    Some(i) => {
                        let existing = match std::mem::take(&mut merged[i]) {
                            Value::Map(m) => m,
                            _ => Map::new(),
                        };
                        merged[i] = Value::Map(merge_map(existing, p, &item_meta)?);
                    }
                    None => merged.push(Value::Map(merge_map(Map::new(), p, &item_meta)?)),
                }
            }
            Ok(merged)
        }
    }
}

/// Reorders `items` after a `$setElementOrder` directive.
///
/// Listed items come out in directive order. An item the directive does not
/// list stays right behind the listed item that preceded it; unlisted items
/// at the head of the list stay at the head.
fn reorder(items: Vec<Value>, order: &[Value], strategy: &ListStrategy) -> Vec<Value> {
    let identity = |v: &Value| -> Option<Value> {
        match strategy {
            ListStrategy::MergeByKeys(keys) => v
                .as_map()
                .and_then(|m| merge_key(m, keys).ok())
                .map(|k| Value::Map(k.to_map())),
            _ => Some(v.clone()),
        }
    };

    let order_ids: Vec<Option<Value>> = order.iter().map(|v| identity(v)).collect();
    let mut slots: Vec<(Option<Value>, Vec<Value>)> = vec![(None, Vec::new()); order.len()];
    let mut leading = Vec::new();
    let mut last: Option<usize> = None;

    for item in items {
        let id = identity(&item);
        let listed = id.as_ref().and_then(|id| {
            order_ids
                .iter()
                .position(|o| o.as_ref() == Some(id))
                .filter(|&i| slots[i].0.is_none())
        });
        match (listed, last) {
            (Some(i), _) => {
                slots[i].0 = Some(item);
                last = Some(i);
            }
            (None, Some(i)) => slots[i].1.push(item),
            (None, None) => leading.push(item),
        }
    }

    let mut out = leading;
    for (item, trailing) in slots {
        out.extend(item);
        out.extend(trailing);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builtin_schema;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    fn map(json: &str) -> Map {
        match from_json(json).unwrap() {
            Value::Map(m) => m,
            other => panic!("expected map, got {:?}", other),
        }
    }

    fn apply(doc: &str, patch: &str) -> Map {
        strategic_merge_patch(&map(doc), &map(patch), &PatchMeta::new(builtin_schema(), "pod")).unwrap()
    }

    #[test]
    fn test_apply_merges_maps_and_deletes_nulls() {
        assert_eq!(
            apply(
                r#"{"metadata":{"labels":{"a":"1","b":"2"}}}"#,
                r#"{"metadata":{"labels":{"b":null,"c":"3"}}}"#
            ),
            map(r#"{"metadata":{"labels":{"a":"1","c":"3"}}}"#)
        );
    }

    #[test]
    fn test_apply_keyed_list() {
        assert_eq!(
            apply(
                r#"{"spec":{"containers":[{"name":"a","image":"x"},{"name":"b","image":"y"}]}}"#,
                r#"{"spec":{"containers":[{"name":"b","image":"z"},{"name":"a","$patch":"delete"},{"name":"c","image":"w"}]}}"#
            ),
            map(r#"{"spec":{"containers":[{"name":"b","image":"z"},{"name":"c","image":"w"}]}}"#)
        );
    }

    #[test]
    fn test_apply_primitive_list_directives() {
        assert_eq!(
            apply(
                r#"{"metadata":{"finalizers":["a","b"]}}"#,
                r#"{"metadata":{"$deleteFromPrimitiveList/finalizers":["b"],"finalizers":["c"]}}"#
            ),
            map(r#"{"metadata":{"finalizers":["a","c"]}}"#)
        );
    }

    #[test]
    fn test_apply_replaces_untyped_lists() {
        assert_eq!(
            apply(
                r#"{"spec":{"tolerations":[{"key":"a"}]}}"#,
                r#"{"spec":{"tolerations":[{"key":"b"}]}}"#
            ),
            map(r#"{"spec":{"tolerations":[{"key":"b"}]}}"#)
        );
    }

    #[test]
    fn test_set_element_order_keeps_unlisted_items_in_place() {
        assert_eq!(
            apply(
                r#"{"spec":{"containers":[{"name":"sidecar"},{"name":"a"},{"name":"b"},{"name":"injected"}]}}"#,
                r#"{"spec":{"$setElementOrder/containers":[{"name":"b"},{"name":"a"}]}}"#
            ),
            map(r#"{"spec":{"containers":[{"name":"sidecar"},{"name":"b"},{"name":"injected"},{"name":"a"}]}}"#)
        );
    }

    #[test]
    fn test_set_element_order_without_changes_is_a_no_op() {
        let doc = r#"{"spec":{"containers":[{"name":"a"},{"name":"istio-proxy"}]}}"#;
        assert_eq!(
            apply(doc, r#"{"spec":{"$setElementOrder/containers":[{"name":"a"}]}}"#),
            map(doc)
        );
    }

    #[test]
    fn test_unknown_patch_type() {
        let err = strategic_merge_patch(
            &Map::new(),
            &map(r#"{"$patch":"explode"}"#),
            &PatchMeta::untyped(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Merge { .. }));
    }
}
