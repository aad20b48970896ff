use super::{ensure_kind, KindMatcher, ObjectMatcher};
use crate::error::{Result, ResultExt};
use crate::object::{Kind, ResourceObject};
use crate::value::{Map, Value};
use tracing::trace;

/// PodMatcher compares pods, ignoring the service account token volume the
/// server mounts into every pod.
#[derive(Debug, Clone, Copy)]
pub struct PodMatcher<'a> {
    matcher: &'a ObjectMatcher,
}

impl<'a> PodMatcher<'a> {
    pub fn new(matcher: &'a ObjectMatcher) -> Self {
        PodMatcher { matcher }
    }
}

impl KindMatcher for PodMatcher<'_> {
    fn kind(&self) -> Kind {
        Kind::Pod
    }

    fn match_objects(&self, old: &ResourceObject, new: &ResourceObject) -> Result<bool> {
        let name = new.display_name();
        ensure_kind(old, Kind::Pod).context("could not match pods", &name)?;
        ensure_kind(new, Kind::Pod).context("could not match pods", &name)?;

        let mut new_value = new.value().clone();
        self.matcher.defaulter().apply_defaults(Kind::Pod, &mut new_value);

        let mut old_data = ObjectMatcher::project_spec(old.value());
        if let Some(spec) = old_data.get_path_mut(&["spec"]).and_then(Value::as_map_mut) {
            strip_token_volumes(spec);
        }
        let new_data = ObjectMatcher::project_spec(&new_value);

        self.matcher.compare(new, &old_data, &new_data)
    }
}

/// Removes `<serviceAccountName>-token-*` volumes and every mount that
/// referenced one of them.
fn strip_token_volumes(spec: &mut Map) {
    let prefix = format!(
        "{}-token-",
        spec.get("serviceAccountName")
            .and_then(Value::as_str)
            .unwrap_or_default()
    );

    let mut removed: Vec<String> = Vec::new();
    if let Some(Value::List(volumes)) = spec.get_mut("volumes") {
        volumes.retain(|volume| {
            match volume.get_path(&["name"]).and_then(Value::as_str) {
                Some(name) if name.starts_with(&prefix) => {
                    removed.push(name.to_string());
                    false
                }
                _ => true,
            }
        });
    }
    if removed.is_empty() {
        return;
    }
    trace!(volumes = ?removed, "ignoring service account token volumes");

    for key in ["containers", "initContainers"] {
        let Some(Value::List(containers)) = spec.get_mut(key) else {
            continue;
        };
        for container in containers.iter_mut() {
            if let Some(Value::List(mounts)) = container.get_path_mut(&["volumeMounts"]) {
                mounts.retain(|mount| {
                    mount
                        .get_path(&["name"])
                        .and_then(Value::as_str)
                        .map_or(true, |name| !removed.iter().any(|r| r == name))
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_token_volumes() {
        let mut spec = from_json(
            r#"{
                "serviceAccountName": "builder",
                "volumes": [{"name": "data"}, {"name": "builder-token-x7k2p"}, {"name": "default-token-abcde"}],
                "containers": [{"name": "app", "volumeMounts": [
                    {"name": "data", "mountPath": "/data"},
                    {"name": "builder-token-x7k2p", "mountPath": "/var/run/secrets/kubernetes.io/serviceaccount"}
                ]}],
                "initContainers": [{"name": "init", "volumeMounts": [
                    {"name": "builder-token-x7k2p", "mountPath": "/var/run/secrets/kubernetes.io/serviceaccount"}
                ]}]
            }"#,
        )
        .unwrap();
        strip_token_volumes(spec.as_map_mut().unwrap());

        assert_eq!(
            spec,
            from_json(
                r#"{
                    "serviceAccountName": "builder",
                    "volumes": [{"name": "data"}, {"name": "default-token-abcde"}],
                    "containers": [{"name": "app", "volumeMounts": [{"name": "data", "mountPath": "/data"}]}],
                    "initContainers": [{"name": "init", "volumeMounts": []}]
                }"#
            )
            .unwrap()
        );
    }

    #[test]
    fn test_strip_token_volumes_without_service_account() {
        let mut spec = from_json(
            r#"{"volumes": [{"name": "-token-abc"}, {"name": "cache"}], "containers": [{"name": "app"}]}"#,
        )
        .unwrap();
        strip_token_volumes(spec.as_map_mut().unwrap());
        assert_eq!(
            spec,
            from_json(r#"{"volumes": [{"name": "cache"}], "containers": [{"name": "app"}]}"#).unwrap()
        );
    }
}
