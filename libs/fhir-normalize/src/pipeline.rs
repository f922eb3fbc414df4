use crate::bundle::{dedup_bundle_entries, merge_adjacent_extension_entries};
use crate::error::Result;
use crate::prune::prune_empty;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NormalizeOptions {
    /// Drop null and empty values before deduplication.
    #[serde(default = "default_true")]
    pub ignore_empty_fields: bool,
    /// Fold extension-only continuation entries into their predecessor.
    #[serde(default)]
    pub merge_extension_entries: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            ignore_empty_fields: true,
            merge_extension_entries: false,
        }
    }
}

/// Decodes rendered template output. JSON5 is accepted, so trailing commas,
/// comments and single-quoted strings left by templates are tolerated.
pub fn decode(text: &str) -> Result<Value> {
    Ok(json5::from_str::<Value>(text)?)
}

/// Decode, prune (unless disabled) and deduplicate bundle entries.
pub fn parse_fhir(text: &str, options: &NormalizeOptions) -> Result<Value> {
    let value = decode(text)?;
    Ok(normalize_value(
        value,
        &NormalizeOptions {
            merge_extension_entries: false,
            ..*options
        },
    ))
}

/// [`parse_fhir`] followed by the adjacent extension merge.
pub fn post_process_fhir(text: &str, options: &NormalizeOptions) -> Result<Value> {
    let value = decode(text)?;
    Ok(normalize_value(
        value,
        &NormalizeOptions {
            merge_extension_entries: true,
            ..*options
        },
    ))
}

/// Decodes `text` and normalizes it as `options` select.
pub fn normalize_fhir(text: &str, options: &NormalizeOptions) -> Result<Value> {
    let value = decode(text)?;
    Ok(normalize_value(value, options))
}

/// Normalizes an already decoded value.
pub fn normalize_value(value: Value, options: &NormalizeOptions) -> Value {
    let mut value = if options.ignore_empty_fields {
        prune_empty(value)
    } else {
        value
    };
    let deduplicated = dedup_bundle_entries(&mut value);
    let merged = if options.merge_extension_entries {
        merge_adjacent_extension_entries(&mut value)
    } else {
        0
    };
    tracing::debug!(deduplicated, merged, "normalized FHIR output");
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_defaults() {
        let options: NormalizeOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options, NormalizeOptions::default());
        assert!(options.ignore_empty_fields);
        assert!(!options.merge_extension_entries);
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(parse_fhir("{}", &NormalizeOptions::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_keep_empty_fields() {
        let options = NormalizeOptions {
            ignore_empty_fields: false,
            ..NormalizeOptions::default()
        };
        assert_eq!(
            parse_fhir(r#"{"a": "", "b": null}"#, &options).unwrap(),
            json!({"a": "", "b": null})
        );
        assert_eq!(
            parse_fhir(r#"{"a": "", "b": null}"#, &NormalizeOptions::default()).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_non_object_roots_pass_through() {
        let options = NormalizeOptions::default();
        assert_eq!(parse_fhir("['a', null, 'b']", &options).unwrap(), json!(["a", "b"]));
        assert_eq!(parse_fhir("true", &options).unwrap(), json!(true));
        assert_eq!(parse_fhir("'  '", &options).unwrap(), json!(""));
    }

    #[test]
    fn test_json5_tolerance() {
        let text = "{\n  // rendered by a template\n  resourceType: 'Patient',\n  id: \"p1\",\n  name: [{family: 'Doe',},],\n}";
        assert_eq!(
            parse_fhir(text, &NormalizeOptions::default()).unwrap(),
            json!({"resourceType": "Patient", "id": "p1", "name": [{"family": "Doe"}]})
        );
    }

    #[test]
    fn test_decode_error() {
        let err = parse_fhir("{\"a\": ", &NormalizeOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("JSON decode error"));
    }

    #[test]
    fn test_extension_merge_only_in_post_process() {
        let text = r#"{"entry": [
            {"resource": {"resourceType": "Patient", "id": "p1"}},
            {"resource": {"resourceType": "Patient", "extension": [{"url": "x"}]}}
        ]}"#;
        let options = NormalizeOptions::default();
        assert_eq!(parse_fhir(text, &options).unwrap()["entry"].as_array().unwrap().len(), 2);
        assert_eq!(
            post_process_fhir(text, &options).unwrap()["entry"],
            json!([{"resource": {"resourceType": "Patient", "id": "p1", "extension": [{"url": "x"}]}}])
        );
        let merging = NormalizeOptions {
            merge_extension_entries: true,
            ..options
        };
        assert_eq!(
            normalize_fhir(text, &merging).unwrap(),
            post_process_fhir(text, &options).unwrap()
        );
    }
}
