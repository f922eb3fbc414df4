use std::fmt;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where in the parse a wrapped failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// Header validation of the first segment.
    Header,
    /// Splitting or transforming the segment at `index` (0-based).
    Segment { index: usize },
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseStage::Header => f.write_str("header validation"),
            ParseStage::Segment { index } => write!(f, "segment {index}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("HL7v2 message is empty")]
    EmptyInput,

    #[error("Malformed HL7v2 header: {0}")]
    MalformedHeader(String),

    #[error("Failed to parse HL7v2 message at {stage}: {source}")]
    InputParsing {
        stage: ParseStage,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// True for the errors that mean "this is not an HL7v2 message at all".
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Error::EmptyInput | Error::MalformedHeader(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
