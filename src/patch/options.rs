//! Ignore rules applied to both sides before a patch is calculated.
//!
//! Every option receives the serialized current and modified objects and
//! returns both, possibly rewritten. Options run in the order they are
//! passed and are idempotent. An option whose subtree is absent leaves the
//! documents alone.
//!
//! The original configuration only goes through `apply_original`, which
//! leaves it untouched unless an option overrides it.

use crate::error::{Error, Result};
use crate::value::{self, Map, Value};
use std::fmt;

/// CalculateOption rewrites the (current, modified) pair before diffing.
pub trait CalculateOption: Send + Sync {
    /// Stage name reported in errors and logs.
    fn name(&self) -> &str;

    fn apply(&self, current: Vec<u8>, modified: Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Rewrites the original configuration. `current` and `modified` are
    /// the pair as this option receives it in `apply`.
    fn apply_original(&self, original: Vec<u8>, _current: &[u8], _modified: &[u8]) -> Result<Vec<u8>> {
        Ok(original)
    }
}

impl fmt::Debug for dyn CalculateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalculateOption({})", self.name())
    }
}

fn decode(bytes: &[u8], side: &str) -> Result<Map> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::encoding(format!("could not unmarshal byte sequence for {}", side), e))
}

fn encode(map: Map, side: &str) -> Result<Vec<u8>> {
    value::to_vec(&Value::Map(map))
        .map_err(|e| Error::encoding(format!("could not marshal byte sequence for {}", side), e))
}

fn rewrite_one<F>(bytes: &[u8], side: &str, edit: F) -> Result<Vec<u8>>
where
    F: Fn(&mut Map),
{
    let mut map = decode(bytes, side)?;
    edit(&mut map);
    encode(map, side)
}

/// Decodes both sides, rewrites each with `edit` and encodes them again.
fn rewrite_both<F>(current: &[u8], modified: &[u8], edit: F) -> Result<(Vec<u8>, Vec<u8>)>
where
    F: Fn(&mut Map),
{
    let mut current_map = decode(current, "current")?;
    let mut modified_map = decode(modified, "modified")?;
    edit(&mut current_map);
    edit(&mut modified_map);
    Ok((encode(current_map, "current")?, encode(modified_map, "modified")?))
}

fn drop_status(obj: &mut Map) {
    obj.delete("status");
}

/// Drops the top-level `status` field.
#[derive(Debug, Clone, Default)]
pub struct IgnoreStatusFields;

impl CalculateOption for IgnoreStatusFields {
    fn name(&self) -> &str {
        "ignore-status-fields"
    }

    fn apply(&self, current: Vec<u8>, modified: Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)> {
        rewrite_both(&current, &modified, drop_status)
    }

    fn apply_original(&self, original: Vec<u8>, _current: &[u8], _modified: &[u8]) -> Result<Vec<u8>> {
        rewrite_one(&original, "original", drop_status)
    }
}

/// Drops a field. The path is dotted, so `spec.clusterIP` drops a nested
/// field while `data` drops a top-level one.
#[derive(Debug, Clone)]
pub struct IgnoreField {
    name: String,
    path: Vec<String>,
}

impl IgnoreField {
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        let path = field.split('.').map(String::from).collect();
        IgnoreField {
            name: format!("ignore-field({})", field),
            path,
        }
    }
}

fn delete_path(map: &mut Map, path: &[String]) {
    match path {
        [] => {}
        [last] => {
            map.delete(last);
        }
        [head, rest @ ..] => {
            if let Some(Value::Map(child)) = map.get_mut(head) {
                delete_path(child, rest);
            }
        }
    }
}

impl CalculateOption for IgnoreField {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, current: Vec<u8>, modified: Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)> {
        rewrite_both(&current, &modified, |obj| delete_path(obj, &self.path))
    }

    fn apply_original(&self, original: Vec<u8>, _current: &[u8], _modified: &[u8]) -> Result<Vec<u8>> {
        rewrite_one(&original, "original", |obj| delete_path(obj, &self.path))
    }
}

/// Normalizes the bookkeeping of `spec.volumeClaimTemplates`: the server
/// fills in type meta and a pending status on every template.
#[derive(Debug, Clone, Default)]
pub struct IgnoreVolumeClaimTemplateTypeMetaAndStatus;

impl CalculateOption for IgnoreVolumeClaimTemplateTypeMetaAndStatus {
    fn name(&self) -> &str {
        "ignore-volume-claim-template-type-meta-and-status"
    }

    fn apply(&self, current: Vec<u8>, modified: Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)> {
        rewrite_both(&current, &modified, normalize_claim_templates)
    }

    fn apply_original(&self, original: Vec<u8>, _current: &[u8], _modified: &[u8]) -> Result<Vec<u8>> {
        rewrite_one(&original, "original", normalize_claim_templates)
    }
}

fn normalize_claim_templates(obj: &mut Map) {
    let templates = match obj.get_mut("spec") {
        Some(Value::Map(spec)) => match spec.get_mut("volumeClaimTemplates") {
            Some(Value::List(templates)) => templates,
            _ => return,
        },
        _ => return,
    };
    for template in templates.iter_mut() {
        if let Value::Map(t) = template {
            t.set("kind", Value::from(""));
            t.set("apiVersion", Value::from(""));
            let mut status = Map::new();
            status.set("phase", Value::from("Pending"));
            t.set("status", Value::Map(status));
        }
    }
}

/// Drops `spec.selector` of PodDisruptionBudgets when it is equal on both
/// sides. Older API versions do not allow updating the selector, so an
/// unchanged selector must not turn into a patch.
#[derive(Debug, Clone, Default)]
pub struct IgnorePdbSelector;

fn is_pdb(obj: &Map) -> bool {
    let api_version = obj.get("apiVersion").and_then(Value::as_str).unwrap_or_default();
    let kind = obj.get("kind").and_then(Value::as_str).unwrap_or_default();
    api_version.starts_with("policy/") && kind == "PodDisruptionBudget"
}

fn pdb_selector(obj: &Map) -> Option<&Value> {
    obj.get("spec").and_then(Value::as_map).and_then(|spec| spec.get("selector"))
}

fn same_pdb_selector(current: &[u8], modified: &[u8]) -> Result<bool> {
    let current_map = decode(current, "current")?;
    let modified_map = decode(modified, "modified")?;
    Ok(is_pdb(&current_map)
        && is_pdb(&modified_map)
        && pdb_selector(&current_map) == pdb_selector(&modified_map))
}

fn drop_selector(obj: &mut Map) {
    if let Some(Value::Map(spec)) = obj.get_mut("spec") {
        spec.delete("selector");
    }
}

impl CalculateOption for IgnorePdbSelector {
    fn name(&self) -> &str {
        "ignore-pdb-selector"
    }

    fn apply(&self, current: Vec<u8>, modified: Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)> {
        if !same_pdb_selector(&current, &modified)? {
            return Ok((current, modified));
        }
        rewrite_both(&current, &modified, drop_selector)
    }

    /// The original loses its selector only when the pair does.
    fn apply_original(&self, original: Vec<u8>, current: &[u8], modified: &[u8]) -> Result<Vec<u8>> {
        if !same_pdb_selector(current, modified)? {
            return Ok(original);
        }
        rewrite_one(&original, "original", drop_selector)
    }
}

type OptionFn = dyn Fn(Vec<u8>, Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)> + Send + Sync;

/// FnOption turns a named closure into an option.
pub struct FnOption {
    name: String,
    func: Box<OptionFn>,
}

impl FnOption {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Vec<u8>, Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)> + Send + Sync + 'static,
    {
        FnOption {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOption").field("name", &self.name).finish()
    }
}

impl CalculateOption for FnOption {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, current: Vec<u8>, modified: Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)> {
        (self.func)(current, modified)
    }
}

/// Drops the top-level `status` of both sides.
pub fn ignore_status_fields() -> Box<dyn CalculateOption> {
    Box::new(IgnoreStatusFields)
}

/// Drops `field` (a dotted path) from both sides.
pub fn ignore_field(field: impl Into<String>) -> Box<dyn CalculateOption> {
    Box::new(IgnoreField::new(field))
}

pub fn ignore_volume_claim_template_type_meta_and_status() -> Box<dyn CalculateOption> {
    Box::new(IgnoreVolumeClaimTemplateTypeMetaAndStatus)
}

pub fn ignore_pdb_selector() -> Box<dyn CalculateOption> {
    Box::new(IgnorePdbSelector)
}
