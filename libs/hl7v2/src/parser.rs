use crate::encoding::EncodingCharacters;
use crate::error::{BoxError, Error, ParseStage, Result};
use crate::escape::{
    GrammarEscape, JsonStringEscape, NoGrammarEscape, NoUnescape, StandardUnescape, Unescape,
};
use crate::model::{Component, Field, Hl7Message, Segment};
use serde::Deserialize;

/// Checks the header segment before any splitting happens.
pub trait HeaderValidator: Send + Sync {
    fn validate(&self, header: &str) -> std::result::Result<(), BoxError>;
}

/// Accepts every header.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAnyHeader;

impl HeaderValidator for AcceptAnyHeader {
    fn validate(&self, _header: &str) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

/// Which leaf transforms a parser built with [`Hl7v2Parser::from_options`]
/// uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Hl7v2Options {
    #[serde(default = "default_unescape")]
    pub unescape: bool,
    #[serde(default)]
    pub grammar_escape: bool,
}

fn default_unescape() -> bool {
    true
}

impl Default for Hl7v2Options {
    fn default() -> Self {
        Self {
            unescape: default_unescape(),
            grammar_escape: false,
        }
    }
}

/// HL7v2 message parser with pluggable header validation and leaf
/// transforms.
///
/// `Hl7v2Parser::default()` validates nothing and leaves leaf text as written.
pub struct Hl7v2Parser {
    validator: Box<dyn HeaderValidator>,
    unescape: Box<dyn Unescape>,
    grammar_escape: Box<dyn GrammarEscape>,
}

impl Default for Hl7v2Parser {
    fn default() -> Self {
        Self {
            validator: Box::new(AcceptAnyHeader),
            unescape: Box::new(NoUnescape),
            grammar_escape: Box::new(NoGrammarEscape),
        }
    }
}

impl Hl7v2Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: &Hl7v2Options) -> Self {
        let mut parser = Self::default();
        if options.unescape {
            parser = parser.with_unescape(StandardUnescape);
        }
        if options.grammar_escape {
            parser = parser.with_grammar_escape(JsonStringEscape);
        }
        parser
    }

    pub fn with_validator(mut self, validator: impl HeaderValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_unescape(mut self, unescape: impl Unescape + 'static) -> Self {
        self.unescape = Box::new(unescape);
        self
    }

    pub fn with_grammar_escape(mut self, escape: impl GrammarEscape + 'static) -> Self {
        self.grammar_escape = Box::new(escape);
        self
    }

    /// Parses a CR-separated message.
    ///
    /// Fails with [`Error::EmptyInput`] for blank text and
    /// [`Error::MalformedHeader`] when the first segment is too short to carry
    /// the five encoding characters. Nothing is returned on failure.
    pub fn parse(&self, message: &str) -> Result<Hl7Message> {
        if message.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let raw_segments: Vec<&str> = message.split('\r').filter(|s| !s.is_empty()).collect();
        let header = raw_segments.first().copied().ok_or(Error::EmptyInput)?;

        self.validator
            .validate(header)
            .map_err(|source| Error::InputParsing {
                stage: ParseStage::Header,
                source,
            })?;

        let encoding = EncodingCharacters::from_header(header)?;

        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut segment_ids = Vec::with_capacity(raw_segments.len());
        for (index, raw) in raw_segments.iter().enumerate() {
            let segment = SegmentSplitter {
                parser: self,
                encoding: &encoding,
            }
            .split(raw, index == 0)
            .map_err(|source| Error::InputParsing {
                stage: ParseStage::Segment { index },
                source,
            })?;
            segment_ids.push(segment.id().to_string());
            segments.push(segment);
        }

        tracing::debug!(
            segments = segments.len(),
            header = %segment_ids.first().map(String::as_str).unwrap_or_default(),
            "parsed HL7v2 message"
        );

        Ok(Hl7Message {
            message: message.to_string(),
            segments,
            segment_ids,
            encoding_characters: encoding,
        })
    }
}

/// Parses `message` with the default parser (no validation, identity
/// transforms).
pub fn parse(message: &str) -> Result<Hl7Message> {
    Hl7v2Parser::default().parse(message)
}

/// Rewrites CRLF and lone LF line endings to the CR segment terminator.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\r").replace('\n', "\r")
}

type LeafResult<T> = std::result::Result<T, BoxError>;

struct SegmentSplitter<'p> {
    parser: &'p Hl7v2Parser,
    encoding: &'p EncodingCharacters,
}

impl SegmentSplitter<'_> {
    fn split(&self, raw: &str, is_header: bool) -> LeafResult<Segment> {
        let parts: Vec<&str> = raw.split(self.encoding.field_separator).collect();
        let mut fields = Vec::with_capacity(parts.len() + 1);

        if is_header {
            fields.push(self.field(parts[0])?);
            fields.push(Some(literal_field(
                self.encoding.field_separator.to_string(),
            )));
            fields.push(Some(literal_field(
                parts.get(1).copied().unwrap_or_default().to_string(),
            )));
            for part in parts.iter().skip(2) {
                fields.push(self.field(part)?);
            }
        } else {
            for part in &parts {
                fields.push(self.field(part)?);
            }
        }

        Ok(Segment {
            normalized_text: self.leaf(raw)?,
            fields,
        })
    }

    fn field(&self, raw: &str) -> LeafResult<Option<Field>> {
        if raw.is_empty() {
            return Ok(None);
        }

        let sep = self.encoding.repetition_separator;
        let mut repeats = Vec::new();
        if raw.contains(sep) {
            for repeat in raw.split(sep) {
                repeats.push(self.repeat(repeat)?);
            }
        }

        let first = raw.split(sep).next().unwrap_or_default();
        let Field {
            value, components, ..
        } = self.repeat(first)?;

        Ok(Some(Field {
            value,
            repeats,
            components,
        }))
    }

    fn repeat(&self, raw: &str) -> LeafResult<Field> {
        let components = raw
            .split(self.encoding.component_separator)
            .map(|c| self.component(c))
            .collect::<LeafResult<Vec<_>>>()?;
        Ok(Field {
            value: self.leaf(raw)?,
            repeats: Vec::new(),
            components,
        })
    }

    fn component(&self, raw: &str) -> LeafResult<Option<Component>> {
        if raw.is_empty() {
            return Ok(None);
        }
        let subcomponents = raw
            .split(self.encoding.subcomponent_separator)
            .map(|s| {
                if s.is_empty() {
                    Ok(None)
                } else {
                    self.leaf(s).map(Some)
                }
            })
            .collect::<LeafResult<Vec<_>>>()?;
        Ok(Some(Component {
            value: self.leaf(raw)?,
            subcomponents,
        }))
    }

    fn leaf(&self, raw: &str) -> LeafResult<String> {
        let unescaped = self.parser.unescape.unescape(raw, self.encoding)?;
        let escaped = self.parser.grammar_escape.escape(&unescaped)?;
        Ok(escaped.into_owned())
    }
}

/// Header fields 1 and 2 are taken as written: one component holding the raw
/// text.
fn literal_field(raw: String) -> Field {
    Field {
        value: raw.clone(),
        repeats: Vec::new(),
        components: vec![Some(Component {
            value: raw.clone(),
            subcomponents: vec![Some(raw)],
        })],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSH: &str = "MSH|^~\\&|SendApp|SendFac|RecvApp|RecvFac|20240210063557||ADT^A01|MSG1|P|2.5";

    #[test]
    fn test_empty_input() {
        for input in ["", "   ", "\r\r"] {
            let err = parse(input).unwrap_err();
            assert!(matches!(err, Error::EmptyInput), "{input:?}");
            assert!(err.is_malformed_input());
        }
    }

    #[test]
    fn test_malformed_header() {
        let err = parse("MSH|^").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }

    #[test]
    fn test_msh_only_message() {
        let msg = parse(MSH).unwrap();
        assert_eq!(msg.segments.len(), 1);
        assert_eq!(msg.segment_ids, vec!["MSH"]);
        assert_eq!(msg.encoding_characters.component_separator, '^');
        assert_eq!(msg.message, MSH);
    }

    #[test]
    fn test_header_fields_are_synthesized() {
        let msg = parse(MSH).unwrap();
        let msh = &msg.segments[0];
        assert_eq!(msh.field(0).unwrap().value, "MSH");
        assert_eq!(msh.field(1).unwrap().value, "|");
        let enc = msh.field(2).unwrap();
        assert_eq!(enc.value, "^~\\&");
        assert_eq!(enc.components.len(), 1);
        assert_eq!(enc.component(1).unwrap().value, "^~\\&");
        assert!(enc.repeats.is_empty());
        assert_eq!(msh.field(3).unwrap().value, "SendApp");
        assert_eq!(msh.field(7).unwrap().value, "20240210063557");
        assert!(msh.field(8).is_none());
        assert_eq!(msh.field(9).unwrap().component(2).unwrap().value, "A01");
        assert_eq!(msh.field(12).unwrap().value, "2.5");
    }

    #[test]
    fn test_repeats_components_and_subcomponents() {
        let text = format!("{MSH}\rPID|1||A^^B&&C~D^E|");
        let msg = parse(&text).unwrap();
        let pid = msg.segment("PID").unwrap();
        assert!(pid.field(2).is_none());
        assert!(pid.field(4).is_none());
        assert_eq!(pid.fields.len(), 5);

        let ids = pid.field(3).unwrap();
        assert_eq!(ids.value, "A^^B&&C");
        assert_eq!(ids.repeats.len(), 2);
        assert_eq!(ids.repeats[1].value, "D^E");
        assert_eq!(ids.repeat(1).unwrap().component(2).unwrap().value, "E");

        assert_eq!(ids.component(1).unwrap().value, "A");
        assert!(ids.component(2).is_none());
        assert!(ids.component(0).is_none());
        let third = ids.component(3).unwrap();
        assert_eq!(third.value, "B&&C");
        assert_eq!(third.subcomponent(1), Some("B"));
        assert_eq!(third.subcomponent(2), None);
        assert_eq!(third.subcomponent(3), Some("C"));
    }

    #[test]
    fn test_single_repeat_field_is_its_own_repeat() {
        let msg = parse(&format!("{MSH}\rPID|1")).unwrap();
        let set_id = msg.segment("PID").unwrap().field(1).unwrap();
        assert!(set_id.repeats.is_empty());
        assert_eq!(set_id.repeat(0), Some(set_id));
        assert_eq!(set_id.repeat(1), None);
    }

    #[test]
    fn test_duplicate_segment_ids_are_kept() {
        let text = format!("{MSH}\rNK1|1|A\rNK1|2|B\rPV1|1\r");
        let msg = parse(&text).unwrap();
        assert_eq!(msg.segment_ids, vec!["MSH", "NK1", "NK1", "PV1"]);
        let nk1: Vec<_> = msg
            .segments_by_id("NK1")
            .map(|s| s.field(2).unwrap().value.as_str())
            .collect();
        assert_eq!(nk1, vec!["A", "B"]);
    }

    #[test]
    fn test_unescape_applies_to_every_leaf() {
        let text = format!("{MSH}\rPV1|NHS A\\T\\E^x\\S\\y");
        let raw = parse(&text).unwrap();
        assert_eq!(
            raw.segment("PV1").unwrap().field(1).unwrap().value,
            "NHS A\\T\\E^x\\S\\y"
        );

        let parser = Hl7v2Parser::from_options(&Hl7v2Options::default());
        let msg = parser.parse(&text).unwrap();
        let pv1 = msg.segment("PV1").unwrap();
        assert_eq!(pv1.normalized_text, "PV1|NHS A&E^x^y");
        let field = pv1.field(1).unwrap();
        assert_eq!(field.value, "NHS A&E^x^y");
        assert_eq!(field.component(1).unwrap().value, "NHS A&E");
        assert_eq!(field.component(2).unwrap().value, "x^y");
    }

    #[test]
    fn test_grammar_escape_runs_after_unescape() {
        let parser = Hl7v2Parser::from_options(&Hl7v2Options {
            unescape: true,
            grammar_escape: true,
        });
        let msg = parser
            .parse(&format!("{MSH}\rNTE|1||say \"hi\" \\E\\"))
            .unwrap();
        assert_eq!(
            msg.segment("NTE").unwrap().field(3).unwrap().value,
            "say \\\"hi\\\" \\\\"
        );
    }

    #[test]
    fn test_validator_failure_is_wrapped() {
        struct RequireMsh;
        impl HeaderValidator for RequireMsh {
            fn validate(&self, header: &str) -> std::result::Result<(), BoxError> {
                if header.starts_with("MSH") {
                    Ok(())
                } else {
                    Err(format!("unexpected header '{}'", &header[..3]).into())
                }
            }
        }

        let parser = Hl7v2Parser::new().with_validator(RequireMsh);
        assert!(parser.parse(MSH).is_ok());
        let err = parser.parse("PID|^~\\&|1").unwrap_err();
        assert!(matches!(
            err,
            Error::InputParsing {
                stage: ParseStage::Header,
                ..
            }
        ));
        assert!(!err.is_malformed_input());
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("A\r\nB\nC\rD"), "A\rB\rC\rD");
    }
}
