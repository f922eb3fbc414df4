//! Section lookup over a converted C-CDA document.
//!
//! Sections live at `ClinicalDocument.component.structuredBody.component[*].section`
//! and are identified by their `templateId/@root`.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("template id pattern is valid"));

/// A list as-is, `[]` for null/blank/empty values, otherwise a one-element
/// list.
pub fn to_list_or_empty(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v) if !is_blank(v) => vec![v],
        _ => Vec::new(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// The body components (`POCD_MT000040.Component3`) of a document.
pub fn component3_list(document: &Value) -> Vec<&Value> {
    let body = document
        .get("ClinicalDocument")
        .and_then(|d| d.get("component"))
        .and_then(|c| c.get("structuredBody"))
        .and_then(|b| b.get("component"));
    to_list_or_empty(body)
}

/// The `templateId` entries of a component's section.
pub fn section_template_ids(component: &Value) -> Vec<&Value> {
    to_list_or_empty(component.get("section").and_then(|s| s.get("templateId")))
}

/// True when the id's trimmed `root` equals `template_id`.
pub fn is_template_id(id: &Value, template_id: &str) -> bool {
    id.get("root")
        .and_then(Value::as_str)
        .is_some_and(|root| root.trim() == template_id)
}

/// Map key for a template id: every non-alphanumeric becomes `_`.
pub fn template_id_key(template_id: &str) -> String {
    NON_ALPHANUMERIC.replace_all(template_id, "_").into_owned()
}

/// First section (in document order) carrying any of `template_ids`.
pub fn find_section<'a, S: AsRef<str>>(document: &'a Value, template_ids: &[S]) -> Option<&'a Value> {
    if template_ids.is_empty() {
        return None;
    }
    component3_list(document).into_iter().find_map(|component| {
        let matches = section_template_ids(component).into_iter().any(|id| {
            template_ids
                .iter()
                .any(|template_id| is_template_id(id, template_id.as_ref()))
        });
        if matches {
            component.get("section")
        } else {
            None
        }
    })
}

/// For each `|`-delimited template id, the first section carrying it, keyed by
/// [`template_id_key`]. Ids with no section are left out.
pub fn first_sections_by_template_id(document: &Value, template_ids: &str) -> Map<String, Value> {
    let mut sections = Map::new();
    for template_id in template_ids.split('|') {
        if let Some(section) = find_section(document, &[template_id]) {
            if !is_blank(section) {
                sections.insert(template_id_key(template_id), section.clone());
            }
        }
    }
    sections
}
