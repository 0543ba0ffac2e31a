//! Generic post-order traversal over JSON values, in the spirit of `postwalk`.
//!
//! The walker rebuilds a value from the leaves up: children are fully transformed
//! before the transform sees their parent. A transform that matches on the shape
//! of a node therefore always sees already-normalized children.

use serde_json::{Map, Value};

/// Rebuild `value` bottom-up, applying `transform` to every node.
///
/// Sequences and mappings are rebuilt from their transformed children before
/// `transform` is applied to them; mapping keys are left untouched. Scalars are
/// handed to `transform` directly. The transform is called for every node shape
/// and must return nodes it does not care about unchanged.
///
/// ```
/// use serde_json::json;
/// use patternq::walk::walk;
/// let doubled = walk(|v| match v.as_i64() {
///     Some(n) => json!(n * 2),
///     None => v,
/// }, json!({"a": [1, 2], "b": 3}));
/// assert_eq!(doubled, json!({"a": [2, 4], "b": 6}));
/// ```
pub fn walk<F>(transform: F, value: Value) -> Value
where
    F: Fn(Value) -> Value,
{
    postwalk(&transform, value)
}

fn postwalk<F>(transform: &F, value: Value) -> Value
where
    F: Fn(Value) -> Value,
{
    match value {
        Value::Array(elements) => {
            let rebuilt = elements
                .into_iter()
                .map(|e| postwalk(transform, e))
                .collect();
            transform(Value::Array(rebuilt))
        }
        Value::Object(entries) => {
            let rebuilt: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, postwalk(transform, v)))
                .collect();
            transform(Value::Object(rebuilt))
        }
        scalar @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)) => {
            transform(scalar)
        }
    }
}
