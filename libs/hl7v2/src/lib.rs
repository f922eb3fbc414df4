//! HL7 v2 message parsing.
//!
//! A message is split into segments on CR, segments into fields on the
//! message's own field separator, and fields further into repeats,
//! components and subcomponents. Every leaf passes through pluggable
//! unescape and grammar-escape transforms (see [`escape`]).
//!
//! ```rust
//! use zunder_hl7v2::{Hl7v2Options, Hl7v2Parser};
//!
//! let parser = Hl7v2Parser::from_options(&Hl7v2Options::default());
//! let msg = parser
//!     .parse("MSH|^~\\&|App|Fac\rPID|1||12345^^^MRN")
//!     .unwrap();
//! let pid = msg.segment("PID").unwrap();
//! assert_eq!(pid.field(3).unwrap().component(1).unwrap().value, "12345");
//! ```

pub mod encoding;
pub mod error;
pub mod escape;
mod json;
pub mod model;
pub mod parser;
mod query;

pub use encoding::EncodingCharacters;
pub use error::{BoxError, Error, ParseStage, Result};
pub use escape::{GrammarEscape, JsonStringEscape, NoGrammarEscape, NoUnescape, StandardUnescape, Unescape};
pub use model::{Component, Field, Hl7Message, Segment};
pub use parser::{normalize_line_endings, parse, AcceptAnyHeader, HeaderValidator, Hl7v2Options, Hl7v2Parser};
