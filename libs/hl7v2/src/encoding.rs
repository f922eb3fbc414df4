use crate::error::{Error, Result};
use serde::Serialize;

/// Delimiters declared by a message in its header segment.
///
/// For a standard header `MSH|^~\&|...` the characters at offsets 3 to 7 are
/// the field, component, repetition, escape and subcomponent separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingCharacters {
    pub field_separator: char,
    pub component_separator: char,
    pub repetition_separator: char,
    pub escape_character: char,
    pub subcomponent_separator: char,
}

impl Default for EncodingCharacters {
    fn default() -> Self {
        Self {
            field_separator: '|',
            component_separator: '^',
            repetition_separator: '~',
            escape_character: '\\',
            subcomponent_separator: '&',
        }
    }
}

impl EncodingCharacters {
    pub fn from_header(header: &str) -> Result<Self> {
        let chars: Vec<char> = header.chars().skip(3).take(5).collect();
        match chars.as_slice() {
            &[field, component, repetition, escape, subcomponent] => Ok(Self {
                field_separator: field,
                component_separator: component,
                repetition_separator: repetition,
                escape_character: escape,
                subcomponent_separator: subcomponent,
            }),
            _ => Err(Error::MalformedHeader(format!(
                "expected 5 encoding characters after the segment id, found {} in '{}'",
                chars.len(),
                header
            ))),
        }
    }

    /// The encoding characters as written in the header's second field
    /// (component, repetition, escape, subcomponent).
    pub fn encoding_field(&self) -> String {
        [
            self.component_separator,
            self.repetition_separator,
            self.escape_character,
            self.subcomponent_separator,
        ]
        .iter()
        .collect()
    }
}
