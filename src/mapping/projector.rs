use std::collections::BTreeMap;

use serde_json::Value;

use super::{resolve, Mappings};

/// Resolves every mapping against `doc`. Keys whose path does not resolve
/// are left out of the result.
pub fn project(doc: &Value, mappings: &Mappings) -> BTreeMap<String, String> {
    mappings
        .iter()
        .filter_map(|(key, mapping)| {
            resolve(doc, &mapping.path, mapping.encoding).map(|value| (key.to_string(), value))
        })
        .collect()
}
