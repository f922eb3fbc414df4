use crate::error::{Error, Result};
use crate::precision::Hl7Precision;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// ASCII numeric part with optional fraction, then an optional `±HHMM`
/// offset. Anchored at the start only; trailing text after a match is
/// ignored unless it opens an offset.
static DTM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]*)?)(?:([+-][0-9]{2})([0-9]{2}))?")
        .expect("DTM pattern is valid")
});

/// A parsed instant, either floating (no offset in the source) or pinned to
/// a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Floating(NaiveDateTime),
    Fixed(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Wall-clock date and time as written in the source.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            Timestamp::Floating(dt) => *dt,
            Timestamp::Fixed(dt) => dt.naive_local(),
        }
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            Timestamp::Floating(_) => None,
            Timestamp::Fixed(dt) => Some(*dt.offset()),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp::Fixed(value.with_timezone(&value.offset().fix()))
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Timestamp::Fixed(value)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::Floating(value)
    }
}

/// Result of [`parse_hl7_dtm`]: the precision the source carried plus the
/// instant it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDtm {
    pub precision: Hl7Precision,
    pub timestamp: Timestamp,
}

/// Parses an HL7 v2 `DTM` (`YYYY[MM[DD[HH[MM[SS[.S[S[S[S]]]]]]]]][+/-ZZZZ]`).
///
/// Fields below the detected precision default to the first month/day and
/// zero time. Fractional seconds are rounded to microseconds.
pub fn parse_hl7_dtm(input: &str) -> Result<ParsedDtm> {
    let trimmed = input.trim();
    let malformed = || Error::Malformed(input.to_string());

    let caps = DTM_PATTERN.captures(trimmed).ok_or_else(malformed)?;
    let rest = caps.get(0).map_or(trimmed, |m| &trimmed[m.end()..]);
    if rest.starts_with(['+', '-']) {
        // A sign the pattern could not consume is an incomplete offset.
        return Err(malformed());
    }
    let dtm = caps.get(1).map(|m| m.as_str()).ok_or_else(malformed)?;
    let precision = Hl7Precision::from_dtm_len(dtm.len()).ok_or_else(malformed)?;

    let field = |start: usize, end: usize| -> Result<u32> {
        dtm[start..end].parse::<u32>().map_err(|_| malformed())
    };
    let field_at = |p: Hl7Precision, start: usize, default: u32| -> Result<u32> {
        if precision >= p {
            field(start, start + 2)
        } else {
            Ok(default)
        }
    };

    let year = field(0, 4)?;
    let month = field_at(Hl7Precision::Month, 4, 1)?;
    let day = field_at(Hl7Precision::Day, 6, 1)?;
    let hour = field_at(Hl7Precision::Hour, 8, 0)?;
    let minute = field_at(Hl7Precision::Minute, 10, 0)?;
    let (second, micro) = if precision >= Hl7Precision::Second {
        split_seconds(&dtm[12..]).ok_or_else(malformed)?
    } else {
        (0, 0)
    };

    let invalid = |reason: &'static str| Error::InvalidDatetime {
        input: input.to_string(),
        reason,
    };

    if year < 1 {
        return Err(invalid("year out of range"));
    }
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| invalid("date out of range"))?;
    let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micro)
        .ok_or_else(|| invalid("time out of range"))?;
    let naive = NaiveDateTime::new(date, time);

    let timestamp = match (caps.get(2), caps.get(3)) {
        (Some(hours), Some(minutes)) => {
            let offset = parse_offset(hours.as_str(), minutes.as_str())
                .ok_or_else(|| invalid("offset out of range"))?;
            let fixed = offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| invalid("offset out of range"))?;
            Timestamp::Fixed(fixed)
        }
        _ => Timestamp::Floating(naive),
    };

    tracing::trace!(input = trimmed, precision = %precision, "parsed HL7 DTM");

    Ok(ParsedDtm {
        precision,
        timestamp,
    })
}

/// Splits `SS[.ffff]` into whole seconds and microseconds.
fn split_seconds(text: &str) -> Option<(u32, u32)> {
    let seconds: f64 = text.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let total_micros = (seconds * 1_000_000.0).round() as u64;
    let second = u32::try_from(total_micros / 1_000_000).ok()?;
    Some((second, (total_micros % 1_000_000) as u32))
}

/// `hours` carries the sign (`+01`, `-05`); the sign applies to the whole offset.
fn parse_offset(hours: &str, minutes: &str) -> Option<FixedOffset> {
    let (sign, digits) = hours.split_at(1);
    let hours: i32 = digits.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    let magnitude = hours * 3600 + minutes * 60;
    let seconds = if sign == "-" { -magnitude } else { magnitude };
    FixedOffset::east_opt(seconds)
}
