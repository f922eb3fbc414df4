//! Bundle entry deduplication and extension continuation merging.

use crate::merge::deep_merge;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Identity of a bundle entry: `resourceType`, `meta.versionId` and `id`
/// of its resource, joined with `_`. Missing, empty and numeric zero parts
/// are skipped; an entry with none of them has the empty key.
pub fn entry_key(entry: &Value) -> String {
    let resource = entry.get("resource");
    let part = |value: Option<&Value>| -> Option<String> {
        match value? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            _ => None,
        }
    };

    [
        part(resource.and_then(|r| r.get("resourceType"))),
        part(
            resource
                .and_then(|r| r.get("meta"))
                .and_then(|m| m.get("versionId")),
        ),
        part(resource.and_then(|r| r.get("id"))),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("_")
}

/// Merges entries of `bundle.entry` that share an [`entry_key`], keeping the
/// position of the first occurrence. Later duplicates are folded in with
/// [`deep_merge`].
///
/// Only runs when `bundle` is an object whose `entry` is an array of two or
/// more elements. Returns the number of entries folded away.
pub fn dedup_bundle_entries(bundle: &mut Value) -> usize {
    let Some(Value::Array(entries)) = bundle.get_mut("entry") else {
        return 0;
    };
    if entries.len() < 2 {
        return 0;
    }

    let before = entries.len();
    let mut unique: Vec<Value> = Vec::with_capacity(before);
    let mut index: HashMap<String, usize> = HashMap::new();
    for entry in std::mem::take(entries) {
        let key = entry_key(&entry);
        match index.get(&key) {
            Some(&i) => deep_merge(&mut unique[i], entry),
            None => {
                index.insert(key, unique.len());
                unique.push(entry);
            }
        }
    }
    *entries = unique;

    let merged = before - entries.len();
    if merged > 0 {
        tracing::debug!(merged, remaining = entries.len(), "deduplicated bundle entries");
    }
    merged
}

/// Folds extension-only continuation entries into the entry before them.
///
/// An entry is a continuation when its resource holds nothing but
/// `resourceType` and an `extension` array, and the preceding (already
/// merged) entry has the same `resourceType`. Its extensions are merged into
/// the preceding resource, or become its extensions if it had none.
/// Returns the number of entries folded away.
pub fn merge_adjacent_extension_entries(bundle: &mut Value) -> usize {
    let Some(Value::Array(entries)) = bundle.get_mut("entry") else {
        return 0;
    };

    let before = entries.len();
    let mut out: Vec<Value> = Vec::with_capacity(before);
    for entry in std::mem::take(entries) {
        match out.last_mut() {
            Some(prev) if continues(prev, &entry) => merge_extension(prev, entry),
            _ => out.push(entry),
        }
    }
    *entries = out;

    let merged = before - entries.len();
    if merged > 0 {
        tracing::debug!(merged, "merged extension continuation entries");
    }
    merged
}

fn resource(entry: &Value) -> Option<&Map<String, Value>> {
    entry.get("resource").and_then(Value::as_object)
}

fn resource_type(entry: &Value) -> Option<&str> {
    resource(entry)?.get("resourceType")?.as_str()
}

fn continues(prev: &Value, entry: &Value) -> bool {
    let same_type = matches!(
        (resource_type(prev), resource_type(entry)),
        (Some(a), Some(b)) if a == b
    );
    same_type && resource(entry).is_some_and(is_extension_only)
}

fn is_extension_only(resource: &Map<String, Value>) -> bool {
    matches!(resource.get("extension"), Some(Value::Array(_)))
        && resource
            .keys()
            .all(|key| key == "extension" || key == "resourceType")
}

fn merge_extension(prev: &mut Value, entry: Value) {
    let Some(Value::Object(mut continuation)) = entry.get("resource").cloned() else {
        return;
    };
    let Some(Value::Object(target)) = prev.get_mut("resource") else {
        return;
    };

    if target.contains_key("extension") {
        deep_merge(
            &mut target["extension"],
            continuation.remove("extension").unwrap_or(Value::Null),
        );
    } else if let Some(extension) = continuation.remove("extension") {
        target.insert("extension".to_string(), extension);
    }
}
