//! Changelog dates.
//!
//! A changelog date is a fixed-width `yyyyMMddHHmmss` string. Lexicographic
//! order coincides with chronological order, so the date doubles as the
//! primary key of the changelog store.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sortable changelog timestamp, second resolution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangelogDate(String);

impl ChangelogDate {
    /// Wire format of a changelog date
    pub const FORMAT: &'static str = "%Y%m%d%H%M%S";

    /// Width of a formatted changelog date
    pub const WIDTH: usize = 14;

    /// Parse and validate a changelog date
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if the value is not a 14-digit string
    /// denoting a real calendar instant.
    pub fn parse(value: &str) -> CoreResult<Self> {
        if value.len() != Self::WIDTH || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidDate {
                value: value.to_string(),
                reason: format!("expected {} digits", Self::WIDTH),
            });
        }

        NaiveDateTime::parse_from_str(value, Self::FORMAT).map_err(|e| CoreError::InvalidDate {
            value: value.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self(value.to_string()))
    }

    /// Current UTC time as a changelog date
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().format(Self::FORMAT).to_string())
    }

    /// Build a date from epoch milliseconds, truncating to second resolution
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` if the milliseconds are out of the
    /// representable range.
    pub fn from_timestamp_millis(millis: i64) -> CoreResult<Self> {
        let dt = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            CoreError::InvalidDate {
                value: millis.to_string(),
                reason: "out of range".to_string(),
            }
        })?;
        Ok(Self(dt.format(Self::FORMAT).to_string()))
    }

    /// Epoch milliseconds of this date
    ///
    /// Validity is guaranteed at construction, so the result is always
    /// second-aligned.
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        NaiveDateTime::parse_from_str(&self.0, Self::FORMAT)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default()
    }

    /// The raw 14-digit string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChangelogDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ChangelogDate {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::parse(&value)
    }
}

impl From<ChangelogDate> for String {
    fn from(date: ChangelogDate) -> Self {
        date.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let date = ChangelogDate::parse("20150805124838").unwrap();
        assert_eq!(date.as_str(), "20150805124838");
    }

    #[test]
    fn test_parse_rejects_wrong_width() {
        assert!(ChangelogDate::parse("2015").is_err());
        assert!(ChangelogDate::parse("201508051248380").is_err());
    }

    #[test]
    fn test_parse_rejects_non_digits() {
        assert!(ChangelogDate::parse("2015080512483x").is_err());
    }

    #[test]
    fn test_parse_rejects_impossible_calendar() {
        // Month 13 is not a real instant
        assert!(ChangelogDate::parse("20151305124838").is_err());
    }

    #[test]
    fn test_timestamp_millis_round_trip() {
        let date = ChangelogDate::parse("20200302000001").unwrap();
        let millis = date.timestamp_millis();
        let back = ChangelogDate::from_timestamp_millis(millis).unwrap();
        assert_eq!(date, back);
    }

    #[test]
    fn test_from_millis_truncates_to_seconds() {
        let date = ChangelogDate::parse("20200302000001").unwrap();
        let truncated = ChangelogDate::from_timestamp_millis(date.timestamp_millis() + 999).unwrap();
        assert_eq!(date, truncated);
    }

    #[test]
    fn test_serde_round_trip() {
        let date = ChangelogDate::parse("20150805124838").unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"20150805124838\"");
        let back: ChangelogDate = serde_json::from_str(&json).unwrap();
        assert_eq!(date, back);
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let result: Result<ChangelogDate, _> = serde_json::from_str("\"not-a-date\"");
        assert!(result.is_err());
    }

    // Property tests using proptest
    proptest::proptest! {
        #[test]
        fn prop_lexicographic_order_is_chronological(
            a in 0i64..4_000_000_000,
            b in 0i64..4_000_000_000,
        ) {
            let a_secs = a * 1000;
            let b_secs = b * 1000;
            let da = ChangelogDate::from_timestamp_millis(a_secs).unwrap();
            let db = ChangelogDate::from_timestamp_millis(b_secs).unwrap();
            proptest::prop_assert_eq!(da.cmp(&db), a_secs.cmp(&b_secs));
        }
    }
}
