use serde_json::{Map, Value};

/// Returns a copy of `props` without the listed keys.
///
/// UI layers wrap login buttons around arbitrary caller props; this keeps
/// session configuration from leaking into rendered output.
pub fn omit(props: &Map<String, Value>, excluded_keys: &[&str]) -> Map<String, Value> {
    props
        .iter()
        .filter(|(key, _)| !excluded_keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
