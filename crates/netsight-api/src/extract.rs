//! Path-based lookup into untyped JSON payloads.
//!
//! Used where the shape of a payload depends on runtime data, e.g. the
//! subscription field name inside a `next` frame. Typed envelopes in
//! [`crate::types`] cover everything whose shape is known up front.

use serde_json::Value;

/// Walk `path` from `root`, returning the nested value if every segment exists.
///
/// Object segments match keys; array segments must parse as an index.
/// Never panics, runs in O(path length).
pub fn extract_path<'a, S: AsRef<str>>(path: &[S], root: &'a Value) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, segment| {
        let segment = segment.as_ref();
        match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Like [`extract_path`], falling back to `default` when any segment is
/// absent or the resolved value is `null`.
pub fn extract_path_or<S: AsRef<str>>(path: &[S], root: &Value, default: Value) -> Value {
    match extract_path(path, root) {
        Some(Value::Null) | None => default,
        Some(found) => found.clone(),
    }
}
