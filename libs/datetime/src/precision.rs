use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Precision of an HL7 v2 `DTM`, derived from the length of its numeric part.
///
/// Variants are ordered from coarsest to finest, so `Hl7Precision::Day <
/// Hl7Precision::Second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hl7Precision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// Precision of a FHIR `dateTime`, ordered like [`Hl7Precision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FhirPrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl Hl7Precision {
    pub const ALL: [Hl7Precision; 7] = [
        Hl7Precision::Year,
        Hl7Precision::Month,
        Hl7Precision::Day,
        Hl7Precision::Hour,
        Hl7Precision::Minute,
        Hl7Precision::Second,
        Hl7Precision::Millisecond,
    ];

    /// Length of the numeric DTM part (`YYYYMMDDHHMMSS.FFF`) at this precision.
    pub const fn dtm_len(self) -> usize {
        match self {
            Hl7Precision::Year => 4,
            Hl7Precision::Month => 6,
            Hl7Precision::Day => 8,
            Hl7Precision::Hour => 10,
            Hl7Precision::Minute => 12,
            Hl7Precision::Second => 14,
            Hl7Precision::Millisecond => 16,
        }
    }

    /// Classifies a numeric DTM part by its length.
    ///
    /// Anything of length 16 or more counts as sub-second; other lengths must
    /// match a precision exactly.
    pub fn from_dtm_len(len: usize) -> Option<Self> {
        if len >= Hl7Precision::Millisecond.dtm_len() {
            return Some(Hl7Precision::Millisecond);
        }
        Self::ALL.into_iter().find(|p| p.dtm_len() == len)
    }

    pub const fn to_fhir(self) -> FhirPrecision {
        match self {
            Hl7Precision::Year => FhirPrecision::Year,
            Hl7Precision::Month => FhirPrecision::Month,
            Hl7Precision::Day => FhirPrecision::Day,
            Hl7Precision::Hour => FhirPrecision::Hour,
            Hl7Precision::Minute => FhirPrecision::Minute,
            Hl7Precision::Second => FhirPrecision::Second,
            Hl7Precision::Millisecond => FhirPrecision::Millisecond,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.to_fhir().as_str()
    }
}

impl FhirPrecision {
    /// Length of the ISO 8601 rendering (`YYYY-MM-DDTHH:MM:SS.fff`) at this
    /// precision, without offset.
    pub const fn iso_len(self) -> usize {
        match self {
            FhirPrecision::Year => 4,
            FhirPrecision::Month => 7,
            FhirPrecision::Day => 10,
            FhirPrecision::Hour => 13,
            FhirPrecision::Minute => 16,
            FhirPrecision::Second => 19,
            FhirPrecision::Millisecond => 21,
        }
    }

    pub const fn to_hl7(self) -> Hl7Precision {
        match self {
            FhirPrecision::Year => Hl7Precision::Year,
            FhirPrecision::Month => Hl7Precision::Month,
            FhirPrecision::Day => Hl7Precision::Day,
            FhirPrecision::Hour => Hl7Precision::Hour,
            FhirPrecision::Minute => Hl7Precision::Minute,
            FhirPrecision::Second => Hl7Precision::Second,
            FhirPrecision::Millisecond => Hl7Precision::Millisecond,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FhirPrecision::Year => "year",
            FhirPrecision::Month => "month",
            FhirPrecision::Day => "day",
            FhirPrecision::Hour => "hour",
            FhirPrecision::Minute => "minute",
            FhirPrecision::Second => "second",
            FhirPrecision::Millisecond => "millisecond",
        }
    }
}

impl From<Hl7Precision> for FhirPrecision {
    fn from(value: Hl7Precision) -> Self {
        value.to_fhir()
    }
}

impl From<FhirPrecision> for Hl7Precision {
    fn from(value: FhirPrecision) -> Self {
        value.to_hl7()
    }
}

impl FromStr for FhirPrecision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" | "y" => Ok(FhirPrecision::Year),
            "month" => Ok(FhirPrecision::Month),
            "day" | "d" => Ok(FhirPrecision::Day),
            "hour" | "h" => Ok(FhirPrecision::Hour),
            "minute" | "min" => Ok(FhirPrecision::Minute),
            "second" | "sec" | "s" => Ok(FhirPrecision::Second),
            "millisecond" | "millis" | "ms" => Ok(FhirPrecision::Millisecond),
            _ => Err(Error::UnknownPrecision(s.to_string())),
        }
    }
}

impl FromStr for Hl7Precision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<FhirPrecision>().map(FhirPrecision::to_hl7)
    }
}

impl fmt::Display for FhirPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Hl7Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_ordering() {
        assert!(Hl7Precision::Year < Hl7Precision::Month);
        assert!(Hl7Precision::Second < Hl7Precision::Millisecond);
        assert!(FhirPrecision::Day > FhirPrecision::Month);
        assert_eq!(
            std::cmp::min(Hl7Precision::Minute, Hl7Precision::Day),
            Hl7Precision::Day
        );
    }

    #[test]
    fn test_from_dtm_len() {
        assert_eq!(Hl7Precision::from_dtm_len(4), Some(Hl7Precision::Year));
        assert_eq!(Hl7Precision::from_dtm_len(8), Some(Hl7Precision::Day));
        assert_eq!(Hl7Precision::from_dtm_len(14), Some(Hl7Precision::Second));
        assert_eq!(
            Hl7Precision::from_dtm_len(19),
            Some(Hl7Precision::Millisecond)
        );
        assert_eq!(Hl7Precision::from_dtm_len(5), None);
        assert_eq!(Hl7Precision::from_dtm_len(15), None);
    }

    #[test]
    fn test_mapping_is_one_to_one() {
        for p in Hl7Precision::ALL {
            assert_eq!(p.to_fhir().to_hl7(), p);
        }
        assert_eq!(FhirPrecision::Millisecond.iso_len(), 21);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("day".parse::<FhirPrecision>(), Ok(FhirPrecision::Day));
        assert_eq!("MS".parse::<Hl7Precision>(), Ok(Hl7Precision::Millisecond));
        assert!("fortnight".parse::<FhirPrecision>().is_err());
    }
}
