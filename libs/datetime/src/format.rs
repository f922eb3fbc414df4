//! FHIR `dateTime` rendering.

use crate::error::Result;
use crate::parse::{parse_hl7_dtm, Timestamp};
use crate::precision::{FhirPrecision, Hl7Precision};
use chrono::{FixedOffset, Utc};

/// Renders a timestamp as a FHIR `dateTime` string.
///
/// Fractional seconds (three digits) are written only above `Second`
/// precision. A zero offset is written as `Z`. Precisions at or below `Day`
/// are cut to `YYYY-MM-DD`, `YYYY-MM` or `YYYY`; finer precisions keep the
/// full date, time and offset.
pub fn to_fhir_dtm(timestamp: &Timestamp, precision: Option<FhirPrecision>) -> String {
    let precision = precision.unwrap_or(FhirPrecision::Millisecond);
    let format = if precision > FhirPrecision::Second {
        "%Y-%m-%dT%H:%M:%S%.3f"
    } else {
        "%Y-%m-%dT%H:%M:%S"
    };

    let mut rendered = timestamp.naive_local().format(format).to_string();
    if let Some(offset) = timestamp.offset() {
        rendered.push_str(&format_offset(offset));
    }

    if precision > FhirPrecision::Day {
        return rendered;
    }
    rendered.truncate(precision.iso_len());
    rendered
}

/// Converts HL7 `DTM` text to a FHIR `dateTime` string.
///
/// The output precision is the lesser of `precision` and what the text
/// actually carries; `None` means "as precise as the source".
pub fn hl7_to_fhir_dtm(text: &str, precision: Option<Hl7Precision>) -> Result<String> {
    let parsed = parse_hl7_dtm(text)?;
    let effective = match precision {
        Some(requested) => requested.min(parsed.precision),
        None => parsed.precision,
    };
    Ok(to_fhir_dtm(&parsed.timestamp, Some(effective.to_fhir())))
}

/// Like [`hl7_to_fhir_dtm`], but blank input yields an empty string instead
/// of an error.
pub fn format_as_date_time(text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Ok(String::new());
    }
    hl7_to_fhir_dtm(text, None)
}

/// Renders HL7 `DTM` text as a FHIR `date` (`YYYY-MM-DD` or coarser).
pub fn add_hyphens_date(text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Ok(String::new());
    }
    hl7_to_fhir_dtm(text, Some(Hl7Precision::Day))
}

/// Current instant as a FHIR `dateTime` in UTC with millisecond precision.
pub fn now() -> String {
    to_fhir_dtm(&Timestamp::from(Utc::now()), None)
}

/// FHIR offset suffix: `Z` for UTC, otherwise `+HH:MM` or `-HH:MM`.
/// Seconds in the offset are dropped.
pub fn format_offset(offset: FixedOffset) -> String {
    let east = offset.local_minus_utc();
    if east == 0 {
        return "Z".to_string();
    }
    let sign = if east < 0 { '-' } else { '+' };
    let minutes = east.unsigned_abs() / 60;
    format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}
