//! Per-kind object matching.
//!
//! A matcher decides whether a live object already matches a desired one.
//! Defaults are applied to the desired side, kind specific server artifacts
//! are stripped from the live side, and both are reduced to their identity
//! metadata and spec before they are compared.

mod generic;
mod pod;
mod pvc;
mod service;


pub use generic::GenericMatcher;
pub use pod::PodMatcher;
pub use pvc::PvcMatcher;
pub use service::ServiceMatcher;

use crate::codec::Codec;
use crate::defaults::{BuiltinDefaults, Defaulter};
use crate::error::{Error, Result, ResultExt};
use crate::object::{api_group, Kind, ResourceObject};
use crate::prune::{prune_json, prune_map};
use crate::strategic::{diff, Catalog, DiffOptions, PatchMeta};
use crate::value::{self, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Metadata fields that identify an object and are owned by its author.
pub const IDENTITY_METADATA_FIELDS: &[&str] = &[
    "name",
    "generateName",
    "namespace",
    "labels",
    "annotations",
    "ownerReferences",
    "finalizers",
];

/// KindMatcher compares a live object with a desired one.
pub trait KindMatcher {
    /// Kind handled by the matcher; `Kind::Other` accepts every kind.
    fn kind(&self) -> Kind;

    /// Returns true when `old` (live) already matches `new` (desired).
    fn match_objects(&self, old: &ResourceObject, new: &ResourceObject) -> Result<bool>;
}

/// ObjectMatcher holds what every kind matcher shares and dispatches to the
/// matcher of an object's kind.
#[derive(Clone)]
pub struct ObjectMatcher {
    codec: Codec,
    catalog: Catalog,
    defaulter: Arc<dyn Defaulter>,
}

impl fmt::Debug for ObjectMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMatcher")
            .field("codec", &self.codec)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl Default for ObjectMatcher {
    fn default() -> Self {
        ObjectMatcher::new(Codec::default(), Catalog::builtin(), Arc::new(BuiltinDefaults))
    }
}

impl ObjectMatcher {
    pub fn new(codec: Codec, catalog: Catalog, defaulter: Arc<dyn Defaulter>) -> Self {
        ObjectMatcher {
            codec,
            catalog,
            defaulter,
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn defaulter(&self) -> &dyn Defaulter {
        self.defaulter.as_ref()
    }

    /// Picks the matcher for the kind of the desired object and runs it.
    /// Kind-less desired objects go to the generic matcher.
    ///
    /// Objects of different kinds never match; that is reported as an
    /// error rather than as drift.
    pub fn match_objects(&self, old: &ResourceObject, new: &ResourceObject) -> Result<bool> {
        if !old.kind().is_empty()
            && !new.kind().is_empty()
            && (old.kind() != new.kind() || api_group(old.api_version()) != api_group(new.api_version()))
        {
            return Err(Error::unsupported_kind(
                format!("{} {}", old.api_version(), old.kind()),
                format!("{} {}", new.api_version(), new.kind()),
            ));
        }

        let kind = new.type_kind();
        debug!(object = %new.display_name(), kind = %kind, "matching objects");

        match kind {
            Kind::Pod => PodMatcher::new(self).match_objects(old, new),
            Kind::Service => ServiceMatcher::new(self).match_objects(old, new),
            Kind::PersistentVolumeClaim => PvcMatcher::new(self).match_objects(old, new),
            Kind::Other => GenericMatcher::new(self).match_objects(old, new),
        }
    }

    /// Compares two serialized objects.
    ///
    /// The full two-way patch is computed and then pruned, so map fields
    /// present only on the old (live) side drop out. A keyed list item
    /// keeps its merge key through pruning, which makes any difference
    /// inside it, a live-only field included, count as drift.
    pub fn match_json(&self, old: &[u8], new: &[u8], meta: &PatchMeta) -> Result<bool> {
        let (_, old_map) = prune_json(old)?;
        let (_, new_map) = prune_json(new)?;

        let patch = diff(&old_map, &new_map, meta, DiffOptions::default())?;
        let patch = prune_map(&patch);

        if !patch.is_empty() {
            let rendered = value::to_json(&Value::Map(patch.clone())).unwrap_or_default();
            debug!(patch = %rendered, "objects differ");
        }
        Ok(patch.is_empty())
    }

    /// Projects object metadata down to the fields owned by its author.
    pub fn object_meta(metadata: Option<&Value>) -> Map {
        let metadata = match metadata.and_then(Value::as_map) {
            Some(m) => m,
            None => return Map::new(),
        };
        IDENTITY_METADATA_FIELDS
            .iter()
            .filter_map(|field| metadata.get(field).map(|v| (field.to_string(), v.clone())))
            .collect()
    }

    /// Reduces an object to `{metadata, spec}`.
    pub(crate) fn project_spec(obj: &Value) -> Value {
        let mut projected = Map::new();
        projected.set(
            "metadata",
            Value::Map(ObjectMatcher::object_meta(obj.get_path(&["metadata"]))),
        );
        if let Some(spec) = obj.get_path(&["spec"]) {
            projected.set("spec", spec.clone());
        }
        Value::Map(projected)
    }

    /// Marshals the projected old and new objects and compares them.
    pub(crate) fn compare(&self, new_obj: &ResourceObject, old: &Value, new: &Value) -> Result<bool> {
        let name = new_obj.display_name();
        let old_data = self
            .codec
            .marshal_value(old)
            .context("could not marshal old object", &name)?;
        let new_data = self
            .codec
            .marshal_value(new)
            .context("could not marshal new object", &name)?;

        let meta = self.catalog.patch_meta(new_obj.api_version(), new_obj.kind());
        let matched = self
            .match_json(&old_data, &new_data, &meta)
            .context("could not match objects", &name)?;
        debug!(object = %name, kind = new_obj.kind(), matched, "compared objects");
        Ok(matched)
    }
}

/// Fails unless `obj` is of `expected` kind. Objects without type meta are
/// accepted, API clients commonly drop it.
pub(crate) fn ensure_kind(obj: &ResourceObject, expected: Kind) -> Result<()> {
    if obj.kind().is_empty() || obj.type_kind() == expected {
        return Ok(());
    }
    Err(Error::unsupported_kind(
        format!("{} {}", obj.api_version(), obj.kind()),
        expected.as_str(),
    ))
}
