use serde_json::Value;

use super::{Encoding, PathSpec};

/// Walks `doc` along `path` and encodes the value found there.
///
/// Every node before the last segment has to be a map; anything else, or a
/// missing key, yields `None`. With [`Encoding::String`] only strings, numbers
/// and booleans resolve; maps, sequences and null yield `None`.
pub fn resolve(doc: &Value, path: &PathSpec, encoding: Encoding) -> Option<String> {
    descend(doc, path.segments(), encoding)
}

fn descend(node: &Value, segments: &[String], encoding: Encoding) -> Option<String> {
    let Value::Object(map) = node else {
        return None;
    };

    match segments {
        [last] => encode(map.get(last)?, encoding),
        [head, rest @ ..] => descend(map.get(head)?, rest, encoding),
        [] => None,
    }
}

fn encode(value: &Value, encoding: Encoding) -> Option<String> {
    match encoding {
        Encoding::String => match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        },
        Encoding::Json => serde_json::to_string(value).ok(),
    }
}
