use serde_json::Value;

/// Recursively removes `null`, blank strings, empty arrays and empty objects
/// from arrays and objects. Children are pruned before their parent is
/// checked, so `{"a": {"b": ""}}` disappears entirely. Numbers and booleans
/// always survive.
///
/// The value itself is never removed; a blank top-level string becomes `""`.
pub fn prune_empty(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, prune_empty(value)))
                .filter(|(_, value)| !is_empty(value))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(prune_empty)
                .filter(|value| !is_empty(value))
                .collect(),
        ),
        Value::String(s) if s.trim().is_empty() => Value::String(String::new()),
        other => other,
    }
}

/// `null`, a blank string, `[]` or `{}`.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_empties_cascade() {
        let value = json!({
            "a": {"b": "", "c": [null, " ", {}, []]},
            "d": "kept",
            "e": [{"f": null}, "x"],
        });
        assert_eq!(prune_empty(value), json!({"d": "kept", "e": ["x"]}));
    }

    #[test]
    fn test_falsy_scalars_survive() {
        let value = json!({"count": 0, "active": false, "ratio": 0.0, "name": "\t"});
        assert_eq!(
            prune_empty(value),
            json!({"count": 0, "active": false, "ratio": 0.0})
        );
    }

    #[test]
    fn test_top_level_values() {
        assert_eq!(prune_empty(json!({})), json!({}));
        assert_eq!(prune_empty(json!("   ")), json!(""));
        assert_eq!(prune_empty(json!([null])), json!([]));
        assert_eq!(prune_empty(json!(null)), json!(null));
    }

    #[test]
    fn test_strings_with_content_are_untouched() {
        assert_eq!(prune_empty(json!({"s": " x "})), json!({"s": " x "}));
    }
}
