//! Merge primitives.
//!
//! Strategic merge patches understand the merge keys declared by the schema:
//! keyed list items are merged one by one, set members are added and removed
//! individually and only atomic lists are replaced. Kinds without a schema
//! use plain JSON merge patches.
//!
//! Strategic patches carry these directives:
//!
//! - `$patch: delete` on a keyed list item removes that item;
//! - `$deleteFromPrimitiveList/<field>` lists set members to remove;
//! - `$setElementOrder/<field>` lists the items of a merged list in their
//!   desired order.

mod apply;
mod catalog;
mod diff;
mod jsonmerge;
mod meta;

pub use apply::strategic_merge_patch;
pub use catalog::{Catalog, MergeStrategy};
pub use diff::{create_three_way_merge_patch, create_two_way_merge_patch, diff, DiffOptions};
pub use jsonmerge::{apply_merge_patch, create_merge_patch, create_three_way_json_merge_patch};
pub use meta::{ListStrategy, PatchMeta};

use crate::error::{Error, Result};
use crate::value::{Field, FieldList, Map, Value};

pub const DIRECTIVE_MARKER: &str = "$";
pub const PATCH_DIRECTIVE: &str = "$patch";
pub const PATCH_DIRECTIVE_DELETE: &str = "delete";
pub const PATCH_DIRECTIVE_REPLACE: &str = "replace";
pub const SET_ELEMENT_ORDER_PREFIX: &str = "$setElementOrder";
pub const DELETE_FROM_PRIMITIVE_LIST_PREFIX: &str = "$deleteFromPrimitiveList";

/// Extracts the merge key of a keyed list item.
pub(crate) fn merge_key(item: &Map, keys: &[String]) -> Result<FieldList> {
    let mut fields = Vec::with_capacity(keys.len());
    for name in keys {
        match item.get(name) {
            Some(value) => fields.push(Field {
                name: name.clone(),
                value: value.clone(),
            }),
            None => {
                return Err(Error::merge(format!(
                    "map: {} does not contain declared merge key: {}",
                    crate::value::to_json(&Value::Map(item.clone())).unwrap_or_default(),
                    name
                )))
            }
        }
    }
    Ok(FieldList::with_fields(fields))
}

/// Builds the `$patch: delete` item for the given key.
pub(crate) fn delete_directive(key: &FieldList) -> Map {
    let mut item = key.to_map();
    item.set(PATCH_DIRECTIVE, Value::from(PATCH_DIRECTIVE_DELETE));
    item
}
