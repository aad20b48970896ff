use super::{KindMatcher, ObjectMatcher};
use crate::error::Result;
use crate::object::{Kind, ResourceObject};
use crate::value::{Map, Value};

/// Top-level fields that never take part in a comparison.
const SKIPPED_FIELDS: &[&str] = &["apiVersion", "kind", "status"];

/// GenericMatcher compares objects of kinds without a dedicated matcher.
/// Every top-level field but status is compared, metadata reduced to its
/// identity fields.
#[derive(Debug, Clone, Copy)]
pub struct GenericMatcher<'a> {
    matcher: &'a ObjectMatcher,
}

impl<'a> GenericMatcher<'a> {
    pub fn new(matcher: &'a ObjectMatcher) -> Self {
        GenericMatcher { matcher }
    }

    fn project(obj: &Value) -> Value {
        let Some(root) = obj.as_map() else {
            return Value::Map(Map::new());
        };
        let mut projected: Map = root
            .iter()
            .filter(|(key, _)| !SKIPPED_FIELDS.contains(&key.as_str()) && key.as_str() != "metadata")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        projected.set(
            "metadata",
            Value::Map(ObjectMatcher::object_meta(root.get("metadata"))),
        );
        Value::Map(projected)
    }
}

impl KindMatcher for GenericMatcher<'_> {
    fn kind(&self) -> Kind {
        Kind::Other
    }

    fn match_objects(&self, old: &ResourceObject, new: &ResourceObject) -> Result<bool> {
        let mut new_value = new.value().clone();
        self.matcher
            .defaulter()
            .apply_defaults(new.type_kind(), &mut new_value);

        let old_data = GenericMatcher::project(old.value());
        let new_data = GenericMatcher::project(&new_value);

        self.matcher.compare(new, &old_data, &new_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_project() {
        let obj = from_json(
            r#"{"apiVersion":"v1","kind":"ConfigMap","metadata":{"name":"cfg","uid":"u1"},"data":{"a":"1"},"status":{"x":1}}"#,
        )
        .unwrap();
        assert_eq!(
            GenericMatcher::project(&obj),
            from_json(r#"{"metadata":{"name":"cfg"},"data":{"a":"1"}}"#).unwrap()
        );
    }
}
