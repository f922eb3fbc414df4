use crate::document::{XmlDocument, XmlElement};
use crate::error::Result;
use crate::parse::{document_to_map, AfterParse, KeepAll, ParseFilter, ParseXmlOpts, ParsedXml};
use crate::text::sanitize_str;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Key holding sanitized source markup.
pub const ORIGINAL_DATA_KEY: &str = "_originalData";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CcdaOptions {
    /// Replace each `section/text` narrative with the section's source
    /// markup.
    #[serde(default)]
    pub render_narrative: bool,
    #[serde(default = "default_cdata_key")]
    pub cdata_key: String,
}

fn default_cdata_key() -> String {
    ParseXmlOpts::default().cdata_key
}

impl Default for CcdaOptions {
    fn default() -> Self {
        Self {
            render_narrative: false,
            cdata_key: default_cdata_key(),
        }
    }
}

/// Converts C-CDA documents for the conversion templates.
#[derive(Debug, Clone, Default)]
pub struct CcdaParser {
    options: CcdaOptions,
}

impl CcdaParser {
    pub fn new(options: CcdaOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CcdaOptions {
        &self.options
    }

    pub fn parse(&self, xml: &str) -> Result<ParsedXml> {
        let document = XmlDocument::parse(xml)?;
        Ok(self.convert(&document))
    }

    pub fn parse_bytes(&self, xml: &[u8]) -> Result<ParsedXml> {
        let document = XmlDocument::parse_bytes(xml)?;
        Ok(self.convert(&document))
    }

    pub fn convert(&self, document: &XmlDocument) -> ParsedXml {
        let opts = ParseXmlOpts {
            cdata_key: self.options.cdata_key.clone(),
        };
        if self.options.render_narrative {
            document_to_map(document, &opts, &SectionNarrative { document }, &OriginalData)
        } else {
            document_to_map(document, &opts, &KeepAll, &OriginalData)
        }
    }
}

/// Replaces `section/text` with the sanitized markup of the whole section.
struct SectionNarrative<'d> {
    document: &'d XmlDocument,
}

impl ParseFilter for SectionNarrative<'_> {
    fn filter(
        &self,
        element: &XmlElement,
        parent: Option<&XmlElement>,
        _opts: &ParseXmlOpts,
    ) -> Option<ParsedXml> {
        let section = parent.filter(|p| p.local_name == "section")?;
        if element.local_name != "text" {
            return None;
        }
        let mut out = Map::new();
        out.insert(
            ORIGINAL_DATA_KEY.to_string(),
            Value::String(sanitize_str(self.document.markup(section))),
        );
        Some(out)
    }
}

/// Adds the sanitized source document under [`ORIGINAL_DATA_KEY`].
struct OriginalData;

impl AfterParse for OriginalData {
    fn after_parse(
        &self,
        mut parsed: ParsedXml,
        document: &XmlDocument,
        _opts: &ParseXmlOpts,
    ) -> ParsedXml {
        parsed.insert(
            ORIGINAL_DATA_KEY.to_string(),
            Value::String(sanitize_str(&document.source)),
        );
        parsed
    }
}
