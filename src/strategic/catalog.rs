//! Catalog of kinds with a known merge schema.

use super::meta::PatchMeta;
use crate::object::api_group;
use crate::schema::{builtin_schema, Schema};
use std::collections::HashMap;
use std::sync::Arc;

/// MergeStrategy is the patch flavor used for an object.
#[derive(Debug, Clone)]
pub enum MergeStrategy {
    /// Merge-key aware strategic merge patch.
    Strategic(PatchMeta),
    /// Plain JSON merge patch, for kinds without a known schema.
    JsonMerge,
}

impl MergeStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MergeStrategy::Strategic(_) => "strategic",
            MergeStrategy::JsonMerge => "json-merge",
        }
    }
}

/// (API group, kind, schema type) of every kind registered by
/// [`Catalog::builtin`].
const BUILTIN_KINDS: &[(&str, &str, &str)] = &[
    ("", "Pod", "pod"),
    ("", "Service", "service"),
    ("", "ServiceAccount", "serviceAccount"),
    ("", "Node", "node"),
    ("", "ReplicationController", "workload"),
    ("", "PersistentVolumeClaim", "object"),
    ("", "PersistentVolume", "object"),
    ("", "ConfigMap", "object"),
    ("", "Secret", "object"),
    ("", "Namespace", "object"),
    ("", "Endpoints", "object"),
    ("apps", "Deployment", "workload"),
    ("apps", "StatefulSet", "workload"),
    ("apps", "DaemonSet", "workload"),
    ("apps", "ReplicaSet", "workload"),
    ("batch", "Job", "workload"),
    ("batch", "CronJob", "cronJob"),
    ("policy", "PodDisruptionBudget", "object"),
    ("autoscaling", "HorizontalPodAutoscaler", "object"),
    ("networking.k8s.io", "Ingress", "object"),
    ("networking.k8s.io", "NetworkPolicy", "object"),
    ("rbac.authorization.k8s.io", "Role", "object"),
    ("rbac.authorization.k8s.io", "ClusterRole", "object"),
    ("rbac.authorization.k8s.io", "RoleBinding", "object"),
    ("rbac.authorization.k8s.io", "ClusterRoleBinding", "object"),
    ("storage.k8s.io", "StorageClass", "object"),
];

/// Catalog maps (API group, kind) pairs to schema types.
///
/// Versions are not part of the lookup: every version of a kind shares the
/// merge keys of its lists.
#[derive(Debug, Clone)]
pub struct Catalog {
    schema: Arc<Schema>,
    kinds: HashMap<(String, String), String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::builtin()
    }
}

impl Catalog {
    /// Creates an empty catalog over `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Catalog {
            schema,
            kinds: HashMap::new(),
        }
    }

    /// Creates a catalog with the core kinds registered against the built-in
    /// schema.
    pub fn builtin() -> Self {
        let mut catalog = Catalog::new(builtin_schema());
        for (group, kind, type_name) in BUILTIN_KINDS {
            catalog.register(*group, *kind, *type_name);
        }
        catalog
    }

    /// Registers `kind` of API `group` with a type of the catalog schema.
    pub fn register(
        &mut self,
        group: impl Into<String>,
        kind: impl Into<String>,
        type_name: impl Into<String>,
    ) -> &mut Self {
        self.kinds
            .insert((group.into(), kind.into()), type_name.into());
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns true when the kind has a registered schema type.
    pub fn contains(&self, api_version: &str, kind: &str) -> bool {
        self.type_name(api_version, kind).is_some()
    }

    fn type_name(&self, api_version: &str, kind: &str) -> Option<&String> {
        self.kinds
            .get(&(api_group(api_version).to_string(), kind.to_string()))
    }

    /// Picks the merge strategy of an object.
    pub fn strategy(&self, api_version: &str, kind: &str) -> MergeStrategy {
        match self.type_name(api_version, kind) {
            Some(type_name) => {
                MergeStrategy::Strategic(PatchMeta::new(Arc::clone(&self.schema), type_name))
            }
            None => MergeStrategy::JsonMerge,
        }
    }

    /// Returns the patch meta of an object. Unknown kinds get an untyped
    /// meta whose lists are all replaced as a whole.
    pub fn patch_meta(&self, api_version: &str, kind: &str) -> PatchMeta {
        match self.strategy(api_version, kind) {
            MergeStrategy::Strategic(meta) => meta,
            MergeStrategy::JsonMerge => PatchMeta::untyped(),
        }
    }
}
