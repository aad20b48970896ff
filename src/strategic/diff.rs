//! Strategic merge patch generation.

use super::meta::{ListStrategy, PatchMeta};
use super::{
    delete_directive, merge_key, DELETE_FROM_PRIMITIVE_LIST_PREFIX, DIRECTIVE_MARKER,
    SET_ELEMENT_ORDER_PREFIX,
};
use crate::error::{Error, Result};
use crate::value::{FieldList, Map, Value};

/// DiffOptions selects which kinds of differences a diff reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Do not report fields or list items missing from the modified side.
    pub ignore_deletions: bool,
    /// Report nothing but deletions.
    pub ignore_changes_and_additions: bool,
    /// Emit `$setElementOrder` directives for merged lists.
    pub set_element_order: bool,
}

/// Computes the patch that turns `original` into `modified`.
pub fn diff(original: &Map, modified: &Map, meta: &PatchMeta, opts: DiffOptions) -> Result<Map> {
    diff_maps(original, modified, meta, opts)
}

/// Two-way strategic merge patch, with deletions and element order.
pub fn create_two_way_merge_patch(original: &Map, modified: &Map, meta: &PatchMeta) -> Result<Map> {
    diff_maps(
        original,
        modified,
        meta,
        DiffOptions {
            set_element_order: true,
            ..Default::default()
        },
    )
}

/// Three-way strategic merge patch.
///
/// Changes and additions are taken from the `current` → `modified` diff,
/// deletions from the `original` → `modified` diff, so fields that only the
/// server set on `current` are left alone. A missing original means nothing
/// was applied before and nothing gets deleted.
pub fn create_three_way_merge_patch(
    original: Option<&Map>,
    modified: &Map,
    current: &Map,
    meta: &PatchMeta,
) -> Result<Map> {
    let delta = diff_maps(
        current,
        modified,
        meta,
        DiffOptions {
            ignore_deletions: true,
            set_element_order: true,
            ..Default::default()
        },
    )?;

    let empty = Map::new();
    let deletions = diff_maps(
        original.unwrap_or(&empty),
        modified,
        meta,
        DiffOptions {
            ignore_changes_and_additions: true,
            set_element_order: true,
            ..Default::default()
        },
    )?;

    merge_patches(deletions, delta, meta)
}

fn diff_maps(original: &Map, modified: &Map, meta: &PatchMeta, opts: DiffOptions) -> Result<Map> {
    let mut patch = Map::new();

    for (key, mod_val) in modified.iter() {
        let field_meta = meta.field(key);
        let orig_val = match original.get(key) {
            Some(v) => v,
            None => {
                if !opts.ignore_changes_and_additions {
                    patch.set(key.clone(), mod_val.clone());
                }
                continue;
            }
        };

        match (orig_val, mod_val) {
            (Value::Map(o), Value::Map(m)) if !field_meta.is_atomic_map() => {
                let child = diff_maps(o, m, &field_meta, opts)?;
                if !child.is_empty() {
                    patch.set(key.clone(), Value::Map(child));
                }
            }
            (Value::List(o), Value::List(m)) => {
                diff_list_field(&mut patch, key, o, m, &field_meta, opts)?;
            }
            _ => {
                if orig_val != mod_val && !opts.ignore_changes_and_additions {
                    patch.set(key.clone(), mod_val.clone());
                }
            }
        }
    }

    if !opts.ignore_deletions {
        for key in original.keys() {
            if !modified.has(key) {
                patch.set(key.clone(), Value::Null);
            }
        }
    }

    Ok(patch)
}

fn diff_list_field(
    patch: &mut Map,
    key: &str,
    original: &[Value],
    modified: &[Value],
    meta: &PatchMeta,
    opts: DiffOptions,
) -> Result<()> {
    match meta.list_strategy() {
        ListStrategy::Replace => {
            if original != modified && !opts.ignore_changes_and_additions {
                patch.set(key, Value::List(modified.to_vec()));
            }
        }
        ListStrategy::MergeSet => {
            let additions: Vec<Value> = if opts.ignore_changes_and_additions {
                Vec::new()
            } else {
                modified
                    .iter()
                    .filter(|v| !original.contains(v))
                    .cloned()
                    .collect()
            };
            let deletions: Vec<Value> = if opts.ignore_deletions {
                Vec::new()
            } else {
                original
                    .iter()
                    .filter(|v| !modified.contains(v))
                    .cloned()
                    .collect()
            };

            let set_order = opts.set_element_order
                && ((!opts.ignore_deletions && !deletions.is_empty())
                    || (!opts.ignore_changes_and_additions && original != modified));

            if !additions.is_empty() {
                patch.set(key, Value::List(additions));
            }
            if !deletions.is_empty() {
                patch.set(
                    format!("{}/{}", DELETE_FROM_PRIMITIVE_LIST_PREFIX, key),
                    Value::List(deletions),
                );
            }
            if set_order {
                patch.set(
                    format!("{}/{}", SET_ELEMENT_ORDER_PREFIX, key),
                    Value::List(modified.to_vec()),
                );
            }
        }
        ListStrategy::MergeByKeys(keys) => {
            let (items, order) = diff_keyed_lists(original, modified, &keys, &meta.item(), opts)?;
            if !items.is_empty() {
                patch.set(key, Value::List(items));
            }
            if let Some(order) = order {
                patch.set(
                    format!("{}/{}", SET_ELEMENT_ORDER_PREFIX, key),
                    Value::List(order),
                );
            }
        }
    }
    Ok(())
}

fn keyed_items<'a>(items: &'a [Value], keys: &[String]) -> Result<Vec<(FieldList, &'a Map)>> {
    items
        .iter()
        .map(|item| {
            let map = item.as_map().ok_or_else(|| {
                Error::merge(format!(
                    "list item is a {}, expected a map with merge keys {:?}",
                    item.type_name(),
                    keys
                ))
            })?;
            Ok((merge_key(map, keys)?, map))
        })
        .collect()
}

/// Diffs two lists of maps merged by key. Returns the patch items, deletion
/// directives last, and the element order directive when one is needed.
fn diff_keyed_lists(
    original: &[Value],
    modified: &[Value],
    keys: &[String],
    item_meta: &PatchMeta,
    opts: DiffOptions,
) -> Result<(Vec<Value>, Option<Vec<Value>>)> {
    let original = keyed_items(original, keys)?;
    let modified = keyed_items(modified, keys)?;

    let mut items = Vec::new();
    for (key, mod_item) in &modified {
        match original.iter().find(|(k, _)| k == key) {
            Some((_, orig_item)) => {
                let mut child = diff_maps(orig_item, mod_item, item_meta, opts)?;
                if !child.is_empty() {
                    for field in &key.fields {
                        child.set(field.name.clone(), field.value.clone());
                    }
                    items.push(Value::Map(child));
                }
            }
            None => {
                if !opts.ignore_changes_and_additions {
                    items.push(Value::Map((*mod_item).clone()));
                }
            }
        }
    }

    if !opts.ignore_deletions {
        for (key, _) in &original {
            if !modified.iter().any(|(k, _)| k == key) {
                items.push(Value::Map(delete_directive(key)));
            }
        }
    }

    let order_same = original.len() == modified.len()
        && original.iter().zip(modified.iter()).all(|((a, _), (b, _))| a == b);

    let set_order = opts.set_element_order
        && ((!opts.ignore_changes_and_additions && (!items.is_empty() || !order_same))
            || (!opts.ignore_deletions && !items.is_empty()));

    let order = if set_order {
        Some(
            modified
                .iter()
                .map(|(key, _)| Value::Map(key.to_map()))
                .collect(),
        )
    } else {
        None
    };

    Ok((items, order))
}

/// Merges two patches, `overlay` winning on conflicts. Directives of
/// `overlay` replace those of `base`.
pub(crate) fn merge_patches(mut base: Map, overlay: Map, meta: &PatchMeta) -> Result<Map> {
    for (key, val) in overlay {
        if key.starts_with(DIRECTIVE_MARKER) {
            base.set(key, val);
            continue;
        }

        let field_meta = meta.field(&key);
        let merged = match (base.delete(&key), val) {
            (Some(Value::Map(b)), Value::Map(o)) if !field_meta.is_atomic_map() => {
                Value::Map(merge_patches(b, o, &field_meta)?)
            }
            (Some(Value::List(b)), Value::List(o)) => match field_meta.list_strategy() {
                ListStrategy::MergeByKeys(keys) => {
                    Value::List(merge_keyed_patch_lists(b, o, &keys, &field_meta.item())?)
                }
                _ => Value::List(o),
            },
            (_, v) => v,
        };
        base.set(key, merged);
    }
    Ok(base)
}

fn merge_keyed_patch_lists(
    mut base: Vec<Value>,
    overlay: Vec<Value>,
    keys: &[String],
    item_meta: &PatchMeta,
) -> Result<Vec<Value>> {
    for item in overlay {
        let over = match item {
            Value::Map(m) => m,
            other => {
                base.push(other);
                continue;
            }
        };
        let key = merge_key(&over, keys)?;
        let pos = base.iter().position(|b| {
            b.as_map()
                .and_then(|m| merge_key(m, keys).ok())
                .map_or(false, |k| k == key)
        });
        match pos {
            Some(i) => {
                let existing = match std::mem::take(&mut base[i]) {
                    Value::Map(m) => m,
                    _ => Map::new(),
                };
                base[i] = Value::Map(merge_patches(existing, over, item_meta)?);
            }
            None => base.push(Value::Map(over)),
        }
    }
    Ok(base)
}
