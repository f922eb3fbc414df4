//! XML to JSON tree conversion for C-CDA documents.
//!
//! Elements become maps keyed by namespace declarations (`xmlns`,
//! `xmlns_<prefix>`), attributes, a text key (default `_`) and child element
//! names. A child name seen twice turns into a list. Elements with no
//! content are dropped from their parent, but the root is always a map.
//!
//! ```rust
//! use zunder_ccda::{parse_xml, ParseXmlOpts};
//! use serde_json::json;
//!
//! let parsed = parse_xml("<a>abc<b>123<c/>456</b>def</a>", &ParseXmlOpts::default()).unwrap();
//! assert_eq!(
//!     serde_json::Value::Object(parsed),
//!     json!({"a": {"_": "abcdef", "b": {"_": "123456"}}})
//! );
//! ```

pub mod document;
pub mod error;
pub mod narrative;
pub mod parse;
pub mod sections;
pub mod text;

pub use document::{XmlAttribute, XmlDocument, XmlElement};
pub use error::{Error, Result};
pub use narrative::{CcdaOptions, CcdaParser, ORIGINAL_DATA_KEY};
pub use parse::{
    document_to_map, element_to_map, parse_xml, parse_xml_bytes, parse_xml_with, AfterParse,
    KeepAll, ParseFilter, ParseXmlOpts, ParsedXml, Unchanged,
};
pub use sections::{
    component3_list, find_section, first_sections_by_template_id, is_template_id,
    section_template_ids, template_id_key, to_list_or_empty,
};
pub use text::{join_strs, sanitize_str};
