//! HL7 v2 `DTM` parsing and FHIR `dateTime` rendering.
//!
//! HL7 timestamps carry their own precision in their length: `2024` is a year,
//! `20240210` a day, `20240210063557.920+0100` a millisecond instant with a
//! fixed UTC offset. Parsing keeps that precision next to the timestamp so the
//! FHIR rendering never claims more than the source knew.
//!
//! ```rust
//! use zunder_datetime::hl7_to_fhir_dtm;
//!
//! assert_eq!(
//!     hl7_to_fhir_dtm("20240210063557.920+0100", None).unwrap(),
//!     "2024-02-10T06:35:57.920+01:00"
//! );
//! assert_eq!(hl7_to_fhir_dtm("2024", None).unwrap(), "2024");
//! ```

pub mod error;
pub mod format;
pub mod parse;
pub mod precision;

pub use error::{Error, Result};
pub use format::{
    add_hyphens_date, format_as_date_time, format_offset, hl7_to_fhir_dtm, now, to_fhir_dtm,
};
pub use parse::{parse_hl7_dtm, ParsedDtm, Timestamp};
pub use precision::{FhirPrecision, Hl7Precision};
