//! Built-in merge schema for the core Kubernetes kinds.
//!
//! Only the parts that influence merging are declared: keyed lists, sets and
//! atomic lists. Every undeclared field falls back to `__untyped_deduced_`,
//! where maps merge field by field and lists are replaced as a whole.

use super::Schema;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// YAML source of the built-in schema.
pub const BUILTIN_SCHEMA_YAML: &str = r#"types:
- name: __untyped_atomic_
  scalar: untyped
  list:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
  map:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
- name: __untyped_deduced_
  scalar: untyped
  list:
    elementType:
      namedType: __untyped_atomic_
    elementRelationship: atomic
  map:
    elementType:
      namedType: __untyped_deduced_
    elementRelationship: separable
- name: stringSet
  list:
    elementType:
      scalar: string
    elementRelationship: associative
- name: objectMeta
  map:
    fields:
    - name: ownerReferences
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [uid]
    - name: finalizers
      type:
        namedType: stringSet
    elementType:
      namedType: __untyped_deduced_
- name: object
  map:
    fields:
    - name: metadata
      type:
        namedType: objectMeta
    elementType:
      namedType: __untyped_deduced_
- name: container
  map:
    fields:
    - name: ports
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [containerPort]
    - name: env
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [name]
    - name: volumeMounts
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [mountPath]
    - name: volumeDevices
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [devicePath]
    elementType:
      namedType: __untyped_deduced_
- name: podSpec
  map:
    fields:
    - name: containers
      type:
        list:
          elementType:
            namedType: container
          elementRelationship: associative
          keys: [name]
    - name: initContainers
      type:
        list:
          elementType:
            namedType: container
          elementRelationship: associative
          keys: [name]
    - name: ephemeralContainers
      type:
        list:
          elementType:
            namedType: container
          elementRelationship: associative
          keys: [name]
    - name: volumes
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [name]
    - name: imagePullSecrets
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [name]
    - name: hostAliases
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [ip]
    elementType:
      namedType: __untyped_deduced_
- name: podTemplateSpec
  map:
    fields:
    - name: metadata
      type:
        namedType: objectMeta
    - name: spec
      type:
        namedType: podSpec
    elementType:
      namedType: __untyped_deduced_
- name: pod
  map:
    fields:
    - name: metadata
      type:
        namedType: objectMeta
    - name: spec
      type:
        namedType: podSpec
    elementType:
      namedType: __untyped_deduced_
- name: workloadSpec
  map:
    fields:
    - name: template
      type:
        namedType: podTemplateSpec
    elementType:
      namedType: __untyped_deduced_
- name: workload
  map:
    fields:
    - name: metadata
      type:
        namedType: objectMeta
    - name: spec
      type:
        namedType: workloadSpec
    elementType:
      namedType: __untyped_deduced_
- name: cronJob
  map:
    fields:
    - name: metadata
      type:
        namedType: objectMeta
    - name: spec
      type:
        map:
          fields:
          - name: jobTemplate
            type:
              namedType: workload
          elementType:
            namedType: __untyped_deduced_
    elementType:
      namedType: __untyped_deduced_
- name: service
  map:
    fields:
    - name: metadata
      type:
        namedType: objectMeta
    - name: spec
      type:
        map:
          fields:
          - name: ports
            type:
              list:
                elementType:
                  namedType: __untyped_deduced_
                elementRelationship: associative
                keys: [port]
          elementType:
            namedType: __untyped_deduced_
    elementType:
      namedType: __untyped_deduced_
- name: serviceAccount
  map:
    fields:
    - name: metadata
      type:
        namedType: objectMeta
    - name: secrets
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [name]
    - name: imagePullSecrets
      type:
        list:
          elementType:
            namedType: __untyped_deduced_
          elementRelationship: associative
          keys: [name]
    elementType:
      namedType: __untyped_deduced_
- name: node
  map:
    fields:
    - name: metadata
      type:
        namedType: objectMeta
    - name: spec
      type:
        map:
          fields:
          - name: taints
            type:
              list:
                elementType:
                  namedType: __untyped_deduced_
                elementRelationship: associative
                keys: [key]
          elementType:
            namedType: __untyped_deduced_
    elementType:
      namedType: __untyped_deduced_
"#;

static BUILTIN_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    // The source is a compile-time constant covered by tests; an empty schema
    // only disables keyed merging.
    Arc::new(Schema::from_yaml(BUILTIN_SCHEMA_YAML).unwrap_or_default())
});

/// Returns the parsed built-in schema. Parsing happens once per process.
pub fn builtin_schema() -> Arc<Schema> {
    Arc::clone(&BUILTIN_SCHEMA)
}
