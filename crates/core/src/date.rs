//! Canonical "date-with-timezone" string handling (§6).
//!
//! The wire/storage form is `<ISO-8601 instant in UTC>|<IANA zone name>`, e.g.
//! `2025-10-28T10:30:00.000Z|America/New_York`. No other form is accepted; a parse
//! failure always produces `bad-date-format` (surfaced by callers as [`FieldError::BadDateFormat`]).
//!
//! [`FieldError::BadDateFormat`]: crate::field::FieldError::BadDateFormat

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An instant in UTC paired with the IANA zone name it should be displayed in.
///
/// The instant is authoritative; the zone name is carried through verbatim and is not
/// validated against the IANA database (the core does not depend on a tzdata crate),
/// matching the teacher's policy of trusting caller-supplied configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeTz {
    instant: DateTime<Utc>,
    zone: String,
}

impl DateTimeTz {
    pub fn new(instant: DateTime<Utc>, zone: impl Into<String>) -> Self {
        Self {
            instant,
            zone: zone.into(),
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Render the canonical `<instant>|<zone>` string form.
    pub fn to_canonical_string(&self) -> String {
        format!(
            "{}|{}",
            self.instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.zone
        )
    }

    /// Parse the canonical string form, rejecting anything else.
    pub fn parse_canonical(s: &str) -> Result<Self, BadDateFormat> {
        let (instant_str, zone) = s.split_once('|').ok_or(BadDateFormat)?;
        if zone.is_empty() {
            return Err(BadDateFormat);
        }
        let instant = DateTime::parse_from_rfc3339(instant_str)
            .map_err(|_| BadDateFormat)?
            .with_timezone(&Utc);
        // Require the millisecond-precision 'Z' form the spec's example uses, not just
        // any RFC3339-parseable string: re-render and compare.
        let rendered = instant.to_rfc3339_opts(SecondsFormat::Millis, true);
        if rendered != instant_str {
            return Err(BadDateFormat);
        }
        Ok(Self {
            instant,
            zone: zone.to_string(),
        })
    }
}

impl fmt::Display for DateTimeTz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for DateTimeTz {
    type Err = BadDateFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_canonical(s)
    }
}

/// Marker error for a date string that did not match the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadDateFormat;

impl fmt::Display for BadDateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "date did not match the canonical <instant>|<zone> form")
    }
}

impl std::error::Error for BadDateFormat {}

impl Serialize for DateTimeTz {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for DateTimeTz {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_canonical(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_form() {
        let s = "2025-10-28T10:30:00.000Z|America/New_York";
        let parsed = DateTimeTz::parse_canonical(s).unwrap();
        assert_eq!(parsed.to_canonical_string(), s);
        assert_eq!(parsed.zone(), "America/New_York");
    }

    #[test]
    fn rejects_other_forms() {
        assert!(DateTimeTz::parse_canonical("2025-10-28T10:30:00Z").is_err());
        assert!(DateTimeTz::parse_canonical("2025-10-28").is_err());
        assert!(DateTimeTz::parse_canonical("2025-10-28T10:30:00.000Z|").is_err());
    }
}
