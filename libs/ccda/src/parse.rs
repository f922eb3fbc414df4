//! XML document to JSON map conversion.

use crate::document::{XmlDocument, XmlElement};
use crate::error::Result;
use crate::text::{join_strs, sanitize_str};
use serde::Deserialize;
use serde_json::map::Entry;
use serde_json::{Map, Value};

/// A converted element. The top level holds a single key, the root
/// element's qualified name, plus whatever the after-parse step adds.
pub type ParsedXml = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParseXmlOpts {
    /// Key under which element text is stored.
    #[serde(default = "default_cdata_key")]
    pub cdata_key: String,
}

fn default_cdata_key() -> String {
    "_".to_string()
}

impl Default for ParseXmlOpts {
    fn default() -> Self {
        Self {
            cdata_key: default_cdata_key(),
        }
    }
}

/// Intercepts elements before they are converted.
///
/// Returning `Some(map)` uses `map` in place of the element and skips its
/// subtree; an empty map drops the element from its parent. `None` converts
/// the element normally.
pub trait ParseFilter {
    fn filter(
        &self,
        element: &XmlElement,
        parent: Option<&XmlElement>,
        opts: &ParseXmlOpts,
    ) -> Option<ParsedXml>;
}

/// Runs once on the finished top-level map.
pub trait AfterParse {
    fn after_parse(
        &self,
        parsed: ParsedXml,
        document: &XmlDocument,
        opts: &ParseXmlOpts,
    ) -> ParsedXml;
}

/// Converts every element.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl ParseFilter for KeepAll {
    fn filter(&self, _: &XmlElement, _: Option<&XmlElement>, _: &ParseXmlOpts) -> Option<ParsedXml> {
        None
    }
}

/// Returns the map unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchanged;

impl AfterParse for Unchanged {
    fn after_parse(&self, parsed: ParsedXml, _: &XmlDocument, _: &ParseXmlOpts) -> ParsedXml {
        parsed
    }
}

/// Parses `xml` and converts it with no filter and no after-parse step.
pub fn parse_xml(xml: &str, opts: &ParseXmlOpts) -> Result<ParsedXml> {
    parse_xml_with(xml, opts, &KeepAll, &Unchanged)
}

/// Like [`parse_xml`] for raw bytes, which must be UTF-8.
pub fn parse_xml_bytes(xml: &[u8], opts: &ParseXmlOpts) -> Result<ParsedXml> {
    let document = XmlDocument::parse_bytes(xml)?;
    Ok(document_to_map(&document, opts, &KeepAll, &Unchanged))
}

pub fn parse_xml_with(
    xml: &str,
    opts: &ParseXmlOpts,
    filter: &dyn ParseFilter,
    after: &dyn AfterParse,
) -> Result<ParsedXml> {
    let document = XmlDocument::parse(xml)?;
    Ok(document_to_map(&document, opts, filter, after))
}

/// Converts an already parsed document: `{root_name: root_map}`, then the
/// after-parse step.
pub fn document_to_map(
    document: &XmlDocument,
    opts: &ParseXmlOpts,
    filter: &dyn ParseFilter,
    after: &dyn AfterParse,
) -> ParsedXml {
    let root = element_to_map(&document.root, None, opts, filter);
    let mut parsed = Map::new();
    parsed.insert(document.root.qualified_name(), Value::Object(root));
    let parsed = after.after_parse(parsed, document, opts);
    tracing::debug!(root = %document.root.qualified_name(), "converted XML document");
    parsed
}

/// Converts one element and its subtree.
pub fn element_to_map(
    element: &XmlElement,
    parent: Option<&XmlElement>,
    opts: &ParseXmlOpts,
    filter: &dyn ParseFilter,
) -> ParsedXml {
    if let Some(replacement) = filter.filter(element, parent, opts) {
        return replacement;
    }

    let mut out = Map::new();
    namespaces_to_map(element, parent, &mut out);
    attributes_to_map(element, &mut out);

    let text = sanitize_str(&element.text);
    if !text.is_empty() {
        out.insert(opts.cdata_key.clone(), Value::String(text));
    }

    for child in &element.children {
        let child_out = element_to_map(child, Some(element), opts, filter);
        if !child_out.is_empty() {
            insert_child(&mut out, child.qualified_name(), Value::Object(child_out));
        }
        append_tail(&mut out, &child.tail, &opts.cdata_key);
    }
    out
}

/// Namespace bindings that differ from the parent's, as `xmlns` /
/// `xmlns_<prefix>` keys.
fn namespaces_to_map(element: &XmlElement, parent: Option<&XmlElement>, out: &mut ParsedXml) {
    for (prefix, uri) in &element.namespaces {
        let inherited = parent.and_then(|p| p.namespaces.get(prefix));
        if inherited != Some(uri) {
            out.insert(
                join_strs(Some("xmlns"), prefix.as_deref(), "_"),
                Value::String(uri.clone()),
            );
        }
    }
}

/// Namespaced attributes are keyed by the smallest in-scope prefix bound to
/// their namespace; attributes whose namespace has no such prefix (including
/// `xml:`) use the local name.
fn attributes_to_map(element: &XmlElement, out: &mut ParsedXml) {
    for attr in &element.attributes {
        let prefix = attr.namespace.as_ref().and_then(|ns| {
            element
                .namespaces
                .iter()
                .filter_map(|(prefix, uri)| prefix.as_deref().filter(|_| uri == ns))
                .min()
        });
        out.insert(
            join_strs(prefix, Some(&attr.local_name), "_"),
            Value::String(attr.value.clone()),
        );
    }
}

/// Inserts a child map, promoting to an array on the second occurrence.
fn insert_child(map: &mut ParsedXml, name: String, value: Value) {
    match map.entry(name) {
        Entry::Vacant(v) => {
            v.insert(value);
        }
        Entry::Occupied(mut o) => match o.get_mut() {
            Value::Array(arr) => arr.push(value),
            existing => {
                let old = existing.take();
                *existing = Value::Array(vec![old, value]);
            }
        },
    }
}

fn append_tail(map: &mut ParsedXml, tail: &str, cdata_key: &str) {
    let tail = sanitize_str(tail);
    if tail.is_empty() {
        return;
    }
    match map.get_mut(cdata_key) {
        Some(Value::String(text)) => text.push_str(&tail),
        _ => {
            map.insert(cdata_key.to_string(), Value::String(tail));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(xml: &str) -> Value {
        Value::Object(parse_xml(xml, &ParseXmlOpts::default()).expect("parse failed"))
    }

    #[test]
    fn test_mixed_content() {
        assert_eq!(
            parse("<a>abc<b>123<c/>456</b>def</a>"),
            json!({"a": {"_": "abcdef", "b": {"_": "123456"}}})
        );
    }

    #[test]
    fn test_empty_elements_are_dropped_from_parent() {
        assert_eq!(
            parse("<root>\n  <empty/>\n  <emptyb attr=\"attrvalue\"/>\n  <value>  hello  </value>\n</root>"),
            json!({"root": {"emptyb": {"attr": "attrvalue"}, "value": {"_": "hello"}}})
        );
    }

    #[test]
    fn test_empty_root_is_empty_map() {
        assert_eq!(parse("<root/>"), json!({"root": {}}));
        assert_eq!(parse("<root>   </root>"), json!({"root": {}}));
    }

    #[test]
    fn test_repeated_children_promote_to_list() {
        assert_eq!(
            parse("<a><b>1</b><c>x</c><b>2</b><b>3</b></a>"),
            json!({"a": {"b": [{"_": "1"}, {"_": "2"}, {"_": "3"}], "c": {"_": "x"}}})
        );
    }

    #[test]
    fn test_namespace_declarations_only_where_changed() {
        let xml = r#"<ClinicalDocument xmlns="urn:hl7-org:v3" xmlns:sdtc="urn:hl7-org:sdtc" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <id root="1.2.3"/>
  <sdtc:raceCode code="2106-3"/>
  <value xsi:type="CD" code="x"/>
  <other xmlns="urn:other"><inner a="1"/></other>
</ClinicalDocument>"#;
        assert_eq!(
            parse(xml),
            json!({
                "ClinicalDocument": {
                    "xmlns": "urn:hl7-org:v3",
                    "xmlns_sdtc": "urn:hl7-org:sdtc",
                    "xmlns_xsi": "http://www.w3.org/2001/XMLSchema-instance",
                    "id": {"root": "1.2.3"},
                    "sdtc_raceCode": {"code": "2106-3"},
                    "value": {"xsi_type": "CD", "code": "x"},
                    "other": {"xmlns": "urn:other", "inner": {"a": "1"}}
                }
            })
        );
    }

    #[test]
    fn test_attribute_prefix_uses_smallest_candidate() {
        let xml = r#"<a xmlns:zz="urn:x" xmlns:bb="urn:x"><b zz:attr="v" xml:lang="en"/></a>"#;
        assert_eq!(
            parse(xml),
            json!({"a": {"xmlns_bb": "urn:x", "xmlns_zz": "urn:x", "b": {"bb_attr": "v", "lang": "en"}}})
        );
    }

    #[test]
    fn test_custom_cdata_key() {
        let opts = ParseXmlOpts {
            cdata_key: "#text".to_string(),
        };
        let parsed = parse_xml("<a>x<b>y</b>z</a>", &opts).unwrap();
        assert_eq!(
            Value::Object(parsed),
            json!({"a": {"#text": "xz", "b": {"#text": "y"}}})
        );
    }

    #[test]
    fn test_comment_between_text_joins() {
        assert_eq!(
            parse("<a><d>2</d><e>3<!--c-->4<!--c-->5</e></a>"),
            json!({"a": {"d": {"_": "2"}, "e": {"_": "345"}}})
        );
    }

    struct DropNamed(&'static str);

    impl ParseFilter for DropNamed {
        fn filter(&self, element: &XmlElement, _: Option<&XmlElement>, _: &ParseXmlOpts) -> Option<ParsedXml> {
            (element.local_name == self.0).then(Map::new)
        }
    }

    #[test]
    fn test_filter_drops_element_but_keeps_tail() {
        let parsed = parse_xml_with(
            "<a>one <skip>hidden</skip> two</a>",
            &ParseXmlOpts::default(),
            &DropNamed("skip"),
            &Unchanged,
        )
        .unwrap();
        assert_eq!(Value::Object(parsed), json!({"a": {"_": "onetwo"}}));
    }

    struct Stamp;

    impl AfterParse for Stamp {
        fn after_parse(&self, mut parsed: ParsedXml, document: &XmlDocument, _: &ParseXmlOpts) -> ParsedXml {
            parsed.insert("rootName".into(), json!(document.root.local_name));
            parsed
        }
    }

    #[test]
    fn test_after_parse_sees_document() {
        let parsed = parse_xml_with("<r/>", &ParseXmlOpts::default(), &KeepAll, &Stamp).unwrap();
        assert_eq!(Value::Object(parsed), json!({"r": {}, "rootName": "r"}));
    }

    #[test]
    fn test_bytes_input() {
        let parsed = parse_xml_bytes(b"<a>x</a>", &ParseXmlOpts::default()).unwrap();
        assert_eq!(Value::Object(parsed), json!({"a": {"_": "x"}}));
    }
}
