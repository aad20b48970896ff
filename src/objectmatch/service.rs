use super::{ensure_kind, KindMatcher, ObjectMatcher};
use crate::error::{Result, ResultExt};
use crate::object::{Kind, ResourceObject};
use crate::value::{Map, Value};

/// Port fields kept when an auto-assigned node port is dropped.
const PORT_IDENTITY_FIELDS: &[&str] = &["name", "protocol", "port", "targetPort"];

/// ServiceMatcher compares services, ignoring node ports the server
/// assigned on its own.
#[derive(Debug, Clone, Copy)]
pub struct ServiceMatcher<'a> {
    matcher: &'a ObjectMatcher,
}

impl<'a> ServiceMatcher<'a> {
    pub fn new(matcher: &'a ObjectMatcher) -> Self {
        ServiceMatcher { matcher }
    }
}

impl KindMatcher for ServiceMatcher<'_> {
    fn kind(&self) -> Kind {
        Kind::Service
    }

    fn match_objects(&self, old: &ResourceObject, new: &ResourceObject) -> Result<bool> {
        let name = new.display_name();
        ensure_kind(old, Kind::Service).context("could not match services", &name)?;
        ensure_kind(new, Kind::Service).context("could not match services", &name)?;

        let mut new_value = new.value().clone();
        self.matcher.defaulter().apply_defaults(Kind::Service, &mut new_value);

        let mut old_data = ObjectMatcher::project_spec(old.value());
        let desired_ports = new
            .value()
            .get_path(&["spec", "ports"])
            .and_then(Value::as_list)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if let Some(Value::List(ports)) = old_data.get_path_mut(&["spec", "ports"]) {
            drop_assigned_node_ports(ports, desired_ports);
        }
        let new_data = ObjectMatcher::project_spec(&new_value);

        self.matcher.compare(new, &old_data, &new_data)
    }
}

fn node_port(port: &Value) -> i64 {
    port.get_path(&["nodePort"])
        .and_then(Value::as_int)
        .unwrap_or_default()
}

/// Rebuilds each live port whose node port was assigned by the server,
/// that is the desired port at the same position does not pin one.
fn drop_assigned_node_ports(live: &mut [Value], desired: &[Value]) {
    for (port, wanted) in live.iter_mut().zip(desired) {
        if node_port(wanted) != 0 || node_port(port) <= 0 {
            continue;
        }
        let Some(fields) = port.as_map() else {
            continue;
        };
        let rebuilt: Map = PORT_IDENTITY_FIELDS
            .iter()
            .filter_map(|field| fields.get(field).map(|v| (field.to_string(), v.clone())))
            .collect();
        *port = Value::Map(rebuilt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drop_assigned_node_ports() {
        let mut live = from_json(
            r#"[
                {"name":"http","protocol":"TCP","port":80,"targetPort":8080,"nodePort":31380,"appProtocol":"http"},
                {"name":"https","protocol":"TCP","port":443,"targetPort":8443,"nodePort":30443},
                {"name":"metrics","protocol":"TCP","port":9090,"targetPort":9090,"nodePort":32000}
            ]"#,
        )
        .unwrap();
        let desired = from_json(r#"[{"name":"http","port":80},{"name":"https","port":443,"nodePort":30443}]"#).unwrap();

        drop_assigned_node_ports(
            live.as_list_mut().unwrap(),
            desired.as_list().unwrap(),
        );

        assert_eq!(
            live,
            from_json(
                r#"[
                    {"name":"http","protocol":"TCP","port":80,"targetPort":8080},
                    {"name":"https","protocol":"TCP","port":443,"targetPort":8443,"nodePort":30443},
                    {"name":"metrics","protocol":"TCP","port":9090,"targetPort":9090,"nodePort":32000}
                ]"#
            )
            .unwrap()
        );
    }
}
