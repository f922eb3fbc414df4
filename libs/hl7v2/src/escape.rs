//! Per-leaf text transforms applied while splitting a message.
//!
//! Every split value passes through an [`Unescape`] step and then a
//! [`GrammarEscape`] step. Both default to identity.

use crate::encoding::EncodingCharacters;
use crate::error::BoxError;
use std::borrow::Cow;

/// Decodes HL7 escape sequences in a leaf value.
pub trait Unescape: Send + Sync {
    fn unescape<'a>(
        &self,
        text: &'a str,
        encoding: &EncodingCharacters,
    ) -> Result<Cow<'a, str>, BoxError>;
}

/// Escapes characters that have structural meaning for whatever consumes
/// the parsed leaves downstream.
pub trait GrammarEscape: Send + Sync {
    fn escape<'a>(&self, text: &'a str) -> Result<Cow<'a, str>, BoxError>;
}

/// Leaves escape sequences untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUnescape;

impl Unescape for NoUnescape {
    fn unescape<'a>(
        &self,
        text: &'a str,
        _encoding: &EncodingCharacters,
    ) -> Result<Cow<'a, str>, BoxError> {
        Ok(Cow::Borrowed(text))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoGrammarEscape;

impl GrammarEscape for NoGrammarEscape {
    fn escape<'a>(&self, text: &'a str) -> Result<Cow<'a, str>, BoxError> {
        Ok(Cow::Borrowed(text))
    }
}

/// Decodes the standard HL7 escape sequences against the message's own
/// delimiters:
///
/// | sequence | result |
/// |---|---|
/// | `\F\` `\S\` `\T\` `\R\` `\E\` | field, component, subcomponent, repetition, escape |
/// | `\Xhh..\` | UTF-8 bytes given in hex |
/// | `\.br\` | line break |
///
/// Unknown or unterminated sequences are kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardUnescape;

impl Unescape for StandardUnescape {
    fn unescape<'a>(
        &self,
        text: &'a str,
        encoding: &EncodingCharacters,
    ) -> Result<Cow<'a, str>, BoxError> {
        let esc = encoding.escape_character;
        if !text.contains(esc) {
            return Ok(Cow::Borrowed(text));
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(esc) {
            out.push_str(&rest[..start]);
            let after = &rest[start + esc.len_utf8()..];
            let Some(end) = after.find(esc) else {
                // Unterminated: keep the remainder as written.
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let sequence = &after[..end];
            match decode_sequence(sequence, encoding) {
                Some(decoded) => out.push_str(&decoded),
                None => {
                    out.push(esc);
                    out.push_str(sequence);
                    out.push(esc);
                }
            }
            rest = &after[end + esc.len_utf8()..];
        }
        out.push_str(rest);
        Ok(Cow::Owned(out))
    }
}

fn decode_sequence(sequence: &str, encoding: &EncodingCharacters) -> Option<String> {
    let single = |c: char| Some(c.to_string());
    match sequence {
        "F" => single(encoding.field_separator),
        "S" => single(encoding.component_separator),
        "T" => single(encoding.subcomponent_separator),
        "R" => single(encoding.repetition_separator),
        "E" => single(encoding.escape_character),
        ".br" => Some("\n".to_string()),
        _ => sequence.strip_prefix('X').and_then(decode_hex),
    }
}

fn decode_hex(hex: &str) -> Option<String> {
    if hex.is_empty() || hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

/// Escapes backslashes and double quotes so leaf values can be spliced into
/// JSON string literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStringEscape;

impl GrammarEscape for JsonStringEscape {
    fn escape<'a>(&self, text: &'a str) -> Result<Cow<'a, str>, BoxError> {
        if !text.contains(['\\', '"']) {
            return Ok(Cow::Borrowed(text));
        }
        let mut out = String::with_capacity(text.len() + 4);
        for c in text.chars() {
            if matches!(c, '\\' | '"') {
                out.push('\\');
            }
            out.push(c);
        }
        Ok(Cow::Owned(out))
    }
}
