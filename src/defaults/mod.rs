//! Server-side defaults applied to desired objects before matching.
//!
//! The live object always carries the values the API server filled in. The
//! matchers apply the same defaults to the desired object so that an unset
//! field and its default compare equal. Defaults only fill absent fields.

use crate::object::Kind;
use crate::value::{Map, Value};

/// Defaulter fills in server defaults on a desired object.
pub trait Defaulter: Send + Sync {
    fn apply_defaults(&self, kind: Kind, object: &mut Value);
}

/// NoDefaults leaves objects untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefaults;

impl Defaulter for NoDefaults {
    fn apply_defaults(&self, _kind: Kind, _object: &mut Value) {}
}

/// BuiltinDefaults knows the defaults of the kinds with a dedicated matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDefaults;

impl Defaulter for BuiltinDefaults {
    fn apply_defaults(&self, kind: Kind, object: &mut Value) {
        let spec = match object.as_map_mut() {
            Some(root) => match root.get_mut("spec") {
                Some(Value::Map(spec)) => spec,
                _ => return,
            },
            None => return,
        };
        match kind {
            Kind::Pod => default_pod_spec(spec),
            Kind::Service => default_service_spec(spec),
            Kind::PersistentVolumeClaim => default_pvc_spec(spec),
            Kind::Other => {}
        }
    }
}

fn set_default(map: &mut Map, key: &str, value: Value) {
    if !map.has(key) {
        map.set(key, value);
    }
}

fn for_each_map_item(map: &mut Map, key: &str, mut f: impl FnMut(&mut Map)) {
    if let Some(Value::List(items)) = map.get_mut(key) {
        for item in items.iter_mut() {
            if let Value::Map(m) = item {
                f(m);
            }
        }
    }
}

fn default_pod_spec(spec: &mut Map) {
    set_default(spec, "restartPolicy", Value::from("Always"));
    set_default(spec, "dnsPolicy", Value::from("ClusterFirst"));
    set_default(spec, "terminationGracePeriodSeconds", Value::Int(30));
    set_default(spec, "schedulerName", Value::from("default-scheduler"));
    set_default(spec, "securityContext", Value::Map(Map::new()));

    for containers in ["containers", "initContainers"] {
        for_each_map_item(spec, containers, default_container);
    }
    for_each_map_item(spec, "volumes", default_volume);
}

/// Volume sources whose files get a default mode of `0644`.
const MODE_VOLUME_SOURCES: &[&str] = &["configMap", "secret", "downwardAPI", "projected"];

fn default_volume(volume: &mut Map) {
    for source in MODE_VOLUME_SOURCES {
        if let Some(Value::Map(source)) = volume.get_mut(source) {
            set_default(source, "defaultMode", Value::Int(420));
        }
    }
}

fn default_container(container: &mut Map) {
    set_default(
        container,
        "terminationMessagePath",
        Value::from("/dev/termination-log"),
    );
    set_default(container, "terminationMessagePolicy", Value::from("File"));
    set_default(container, "resources", Value::Map(Map::new()));

    let policy = image_pull_policy(container.get("image").and_then(Value::as_str).unwrap_or_default());
    set_default(container, "imagePullPolicy", Value::from(policy));

    for_each_map_item(container, "ports", |port| {
        set_default(port, "protocol", Value::from("TCP"));
    });
}

/// `Always` for untagged and `latest` images, `IfNotPresent` otherwise.
fn image_pull_policy(image: &str) -> &'static str {
    if image.contains('@') {
        return "IfNotPresent";
    }
    let name = image.rsplit('/').next().unwrap_or(image);
    match name.split_once(':') {
        Some((_, "latest")) | None => "Always",
        Some(_) => "IfNotPresent",
    }
}

fn default_service_spec(spec: &mut Map) {
    set_default(spec, "type", Value::from("ClusterIP"));
    set_default(spec, "sessionAffinity", Value::from("None"));

    for_each_map_item(spec, "ports", |port| {
        set_default(port, "protocol", Value::from("TCP"));
        if let Some(number) = port.get("port").cloned() {
            set_default(port, "targetPort", number);
        }
    });
}

fn default_pvc_spec(spec: &mut Map) {
    set_default(spec, "volumeMode", Value::from("Filesystem"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_yaml;
    use pretty_assertions::assert_eq;

    fn defaulted(kind: Kind, yaml: &str) -> Value {
        let mut value = from_yaml(yaml).unwrap();
        BuiltinDefaults.apply_defaults(kind, &mut value);
        value
    }

    #[test]
    fn test_pod_defaults() {
        let pod = defaulted(
            Kind::Pod,
            r#"spec:
  restartPolicy: Never
  containers:
  - name: app
    image: registry:5000/team/app
    ports:
    - containerPort: 80
  initContainers:
  - name: init
    image: busybox:1.36
  volumes:
  - name: config
    configMap:
      name: web
  - name: cache
    emptyDir: {}
  - name: creds
    secret:
      secretName: creds
      defaultMode: 256
"#,
        );
        assert_eq!(
            pod,
            from_yaml(
                r#"spec:
  restartPolicy: Never
  dnsPolicy: ClusterFirst
  terminationGracePeriodSeconds: 30
  schedulerName: default-scheduler
  securityContext: {}
  containers:
  - name: app
    image: registry:5000/team/app
    imagePullPolicy: Always
    resources: {}
    terminationMessagePath: /dev/termination-log
    terminationMessagePolicy: File
    ports:
    - containerPort: 80
      protocol: TCP
  initContainers:
  - name: init
    image: busybox:1.36
    imagePullPolicy: IfNotPresent
    resources: {}
    terminationMessagePath: /dev/termination-log
    terminationMessagePolicy: File
  volumes:
  - name: config
    configMap:
      name: web
      defaultMode: 420
  - name: cache
    emptyDir: {}
  - name: creds
    secret:
      secretName: creds
      defaultMode: 256
"#
            )
            .unwrap()
        );
    }

    #[test]
    fn test_image_pull_policy() {
        assert_eq!(image_pull_policy("nginx"), "Always");
        assert_eq!(image_pull_policy("nginx:latest"), "Always");
        assert_eq!(image_pull_policy("nginx:1.25"), "IfNotPresent");
        assert_eq!(image_pull_policy("localhost:5000/nginx"), "Always");
        assert_eq!(image_pull_policy("nginx@sha256:abc"), "IfNotPresent");
    }

    #[test]
    fn test_service_defaults() {
        let svc = defaulted(
            Kind::Service,
            r#"spec:
  type: NodePort
  ports:
  - name: http
    port: 80
  - name: https
    port: 443
    targetPort: 8443
    protocol: TCP
"#,
        );
        assert_eq!(
            svc,
            from_yaml(
                r#"spec:
  type: NodePort
  sessionAffinity: None
  ports:
  - name: http
    port: 80
    targetPort: 80
    protocol: TCP
  - name: https
    port: 443
    targetPort: 8443
    protocol: TCP
"#
            )
            .unwrap()
        );
    }

    #[test]
    fn test_pvc_and_other_defaults() {
        let pvc = defaulted(Kind::PersistentVolumeClaim, "spec:\n  storageClassName: fast\n");
        assert_eq!(
            pvc.get_path(&["spec", "volumeMode"]),
            Some(&Value::from("Filesystem"))
        );

        let cm = defaulted(Kind::Other, "spec:\n  a: 1\n");
        assert_eq!(cm, from_yaml("spec:\n  a: 1\n").unwrap());

        let mut no_spec = from_yaml("metadata:\n  name: x\n").unwrap();
        BuiltinDefaults.apply_defaults(Kind::Pod, &mut no_spec);
        assert_eq!(no_spec, from_yaml("metadata:\n  name: x\n").unwrap());
    }
}
