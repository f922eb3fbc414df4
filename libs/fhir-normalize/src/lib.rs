//! Post-render normalization of FHIR JSON produced by conversion templates.
//!
//! Templates emit loose JSON: empty fields, trailing commas, and the same
//! resource rendered more than once. [`parse_fhir`] decodes that output,
//! prunes empty values and folds duplicate `Bundle.entry` elements together.
//!
//! ```rust
//! use zunder_normalize::{parse_fhir, NormalizeOptions};
//! use serde_json::json;
//!
//! let out = parse_fhir(r#"{"a": "", "b": {"c": []}, "d": 0, "e": false,}"#, &NormalizeOptions::default()).unwrap();
//! assert_eq!(out, json!({"d": 0, "e": false}));
//! ```

pub mod bundle;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod prune;

pub use bundle::{dedup_bundle_entries, entry_key, merge_adjacent_extension_entries};
pub use error::{Error, Result};
pub use merge::deep_merge;
pub use pipeline::{
    decode, normalize_fhir, normalize_value, parse_fhir, post_process_fhir, NormalizeOptions,
};
pub use prune::{is_empty, prune_empty};
