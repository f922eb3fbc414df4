//! Deep merge for template output.

use serde_json::Value;

/// Merges `next` into `acc`.
///
/// - `null` in `next` never overwrites (and is never inserted).
/// - Objects merge key by key; keys missing from `acc` are inserted.
/// - Arrays get the elements of `next` that `acc` does not already contain,
///   in `next`'s order.
/// - Anything else (scalars, mismatched kinds) is overwritten by `next`.
pub fn deep_merge(acc: &mut Value, next: Value) {
    match (acc, next) {
        (_, Value::Null) => {}
        (Value::Object(acc), Value::Object(next)) => {
            for (key, value) in next {
                if value.is_null() {
                    continue;
                }
                match acc.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        acc.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(acc), Value::Array(next)) => {
            for value in next {
                if !acc.contains(&value) {
                    acc.push(value);
                }
            }
        }
        (acc, next) => *acc = next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_objects_merge_recursively() {
        let mut acc = json!({"a": 1, "nested": {"x": 1, "y": 2}});
        deep_merge(&mut acc, json!({"b": 2, "nested": {"y": 3, "z": 4}}));
        assert_eq!(acc, json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 3, "z": 4}}));
    }

    #[test]
    fn test_null_never_overwrites() {
        let mut acc = json!({"a": "keep"});
        deep_merge(&mut acc, json!({"a": null, "b": null}));
        assert_eq!(acc, json!({"a": "keep"}));
    }

    #[test]
    fn test_arrays_append_unique() {
        let mut acc = json!({"list": [1, {"k": "v"}, 3]});
        deep_merge(&mut acc, json!({"list": [3, 4, {"k": "v"}, 4, 5]}));
        assert_eq!(acc, json!({"list": [1, {"k": "v"}, 3, 4, 5]}));
    }

    #[test]
    fn test_mismatched_kinds_overwrite() {
        let mut acc = json!({"a": [1], "b": {"c": 1}, "d": "text"});
        deep_merge(&mut acc, json!({"a": {"x": 1}, "b": "flat", "d": 7}));
        assert_eq!(acc, json!({"a": {"x": 1}, "b": "flat", "d": 7}));
    }
}
