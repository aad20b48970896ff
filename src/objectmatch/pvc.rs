use super::{ensure_kind, KindMatcher, ObjectMatcher};
use crate::error::{Result, ResultExt};
use crate::object::{Kind, ResourceObject};
use crate::value::{Map, Value};

/// Annotations the persistent volume controller writes on bound claims.
pub const PVC_BOOKKEEPING_ANNOTATIONS: &[&str] = &[
    "pv.kubernetes.io/bind-completed",
    "pv.kubernetes.io/bound-by-controller",
    "volume.beta.kubernetes.io/storage-provisioner",
];

/// PvcMatcher compares persistent volume claims, ignoring what binding the
/// claim to a volume adds.
#[derive(Debug, Clone, Copy)]
pub struct PvcMatcher<'a> {
    matcher: &'a ObjectMatcher,
}

impl<'a> PvcMatcher<'a> {
    pub fn new(matcher: &'a ObjectMatcher) -> Self {
        PvcMatcher { matcher }
    }
}

impl KindMatcher for PvcMatcher<'_> {
    fn kind(&self) -> Kind {
        Kind::PersistentVolumeClaim
    }

    fn match_objects(&self, old: &ResourceObject, new: &ResourceObject) -> Result<bool> {
        let name = new.display_name();
        ensure_kind(old, Kind::PersistentVolumeClaim)
            .context("could not match persistent volume claims", &name)?;
        ensure_kind(new, Kind::PersistentVolumeClaim)
            .context("could not match persistent volume claims", &name)?;

        let mut new_value = new.value().clone();
        self.matcher
            .defaulter()
            .apply_defaults(Kind::PersistentVolumeClaim, &mut new_value);

        let mut old_data = ObjectMatcher::project_spec(old.value());
        let mut new_data = ObjectMatcher::project_spec(&new_value);

        if let Some(Value::Map(annotations)) = old_data.get_path_mut(&["metadata", "annotations"]) {
            for key in PVC_BOOKKEEPING_ANNOTATIONS {
                annotations.delete(key);
            }
        }

        if let Some(new_spec) = new_data.get_path_mut(&["spec"]).and_then(Value::as_map_mut) {
            let old_spec = old.value().get_path(&["spec"]).and_then(Value::as_map);
            adopt_binding(new_spec, old_spec, new.value().get_path(&["spec"]).and_then(Value::as_map));
        }

        self.matcher.compare(new, &old_data, &new_data)
    }
}

/// Copies the bound volume name from the live spec and drops a defaulted
/// volume mode neither side asked for.
fn adopt_binding(desired: &mut Map, live: Option<&Map>, original: Option<&Map>) {
    if let Some(volume_name) = live.and_then(|spec| spec.get("volumeName")) {
        desired.set("volumeName", volume_name.clone());
    }

    let set_by = |spec: Option<&Map>| spec.is_some_and(|s| s.get("volumeMode").is_some_and(|v| !v.is_null()));
    if !set_by(live) && !set_by(original) {
        desired.delete("volumeMode");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    fn map(json: &str) -> Map {
        from_json(json).unwrap().as_map().unwrap().clone()
    }

    #[test]
    fn test_adopt_binding() {
        let mut desired = map(r#"{"storageClassName":"fast","volumeMode":"Filesystem"}"#);
        let live = map(r#"{"storageClassName":"fast","volumeName":"pvc-3f2a"}"#);
        let original = map(r#"{"storageClassName":"fast"}"#);

        adopt_binding(&mut desired, Some(&live), Some(&original));
        assert_eq!(desired, map(r#"{"storageClassName":"fast","volumeName":"pvc-3f2a"}"#));
    }

    #[test]
    fn test_adopt_binding_keeps_requested_volume_mode() {
        let mut desired = map(r#"{"volumeMode":"Block"}"#);
        let original = map(r#"{"volumeMode":"Block"}"#);

        adopt_binding(&mut desired, None, Some(&original));
        assert_eq!(desired, map(r#"{"volumeMode":"Block"}"#));

        let mut desired = map(r#"{"volumeMode":"Filesystem"}"#);
        let live = map(r#"{"volumeMode":"Filesystem"}"#);
        adopt_binding(&mut desired, Some(&live), Some(&map("{}")));
        assert_eq!(desired, map(r#"{"volumeMode":"Filesystem"}"#));
    }
}
