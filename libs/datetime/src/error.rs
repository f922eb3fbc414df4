use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The text does not look like an HL7 DTM at all.
    #[error("Malformed HL7 datetime {0}")]
    Malformed(String),

    /// The text has DTM shape but names an impossible instant.
    #[error("Invalid HL7 datetime {input}: {reason}")]
    InvalidDatetime { input: String, reason: &'static str },

    #[error("Unknown precision '{0}'")]
    UnknownPrecision(String),
}

pub type Result<T> = std::result::Result<T, Error>;
