//! # Temporal Types — UTC-Only Timestamps
//!
//! `Timestamp` is a UTC-only timestamp truncated to seconds precision.
//!
//! Timestamps appear inside canonical payloads (export snapshots, status
//! details) where byte stability matters: a local offset or sub-second
//! component would make the same instant serialize to different canonical
//! bytes. Non-UTC inputs are rejected at construction, never silently
//! converted on the strict path.
//!
//! Calendar dates (`event_date`, due dates) are plain `chrono::NaiveDate`;
//! the compliance rules operate on dates, not instants.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AvError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an RFC 3339 string, rejecting non-UTC offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// **Rejects non-UTC inputs.** Only the `Z` suffix is accepted — even
    /// `+00:00`, which is semantically equivalent, is refused so that the
    /// canonical byte representation of any timestamp is unique.
    pub fn parse(s: &str) -> Result<Self, AvError> {
        if !s.ends_with('Z') {
            return Err(AvError::Validation(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            AvError::Validation(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// The UTC calendar date of this instant.
    ///
    /// Due-date arithmetic in the status engine is date-based; this is the
    /// bridge from an injected "now" to the engine's "today".
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// This instant shifted forward by `secs` seconds.
    ///
    /// Saturates instead of panicking on overflow; download-handle expiry
    /// windows are far inside the representable range.
    pub fn plus_secs(&self, secs: i64) -> Self {
        match self.0.checked_add_signed(chrono::Duration::seconds(secs)) {
            Some(dt) => Self(dt),
            None => Self(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Render as ISO 8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl<'s> utoipa::ToSchema<'s> for Timestamp {
    fn schema() -> (&'s str, utoipa::openapi::RefOr<utoipa::openapi::Schema>) {
        (
            "Timestamp",
            utoipa::openapi::ObjectBuilder::new()
                .schema_type(utoipa::openapi::SchemaType::String)
                .format(Some(utoipa::openapi::SchemaFormat::KnownFormat(
                    utoipa::openapi::KnownFormat::DateTime,
                )))
                .description(Some("UTC timestamp, seconds precision, Z suffix"))
                .into(),
        )
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_has_no_subseconds() {
        assert_eq!(Timestamp::now().as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(123_456_789).unwrap());
        assert_eq!(ts.to_iso8601(), "2026-03-01T09:30:45Z");
    }

    #[test]
    fn test_parse_z_suffix_accepted() {
        let ts = Timestamp::parse("2026-03-01T09:00:00Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-03-01T09:00:00Z");
    }

    #[test]
    fn test_parse_offset_rejected() {
        assert!(Timestamp::parse("2026-03-01T09:00:00+00:00").is_err());
        assert!(Timestamp::parse("2026-03-01T14:00:00+05:00").is_err());
    }

    #[test]
    fn test_parse_subseconds_truncated() {
        let ts = Timestamp::parse("2026-03-01T09:00:00.250Z").unwrap();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("2026-03-01").is_err());
    }

    #[test]
    fn test_date_bridge() {
        let ts = Timestamp::parse("2026-03-01T23:59:59Z").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn test_ordering() {
        let a = Timestamp::parse("2026-03-01T09:00:00Z").unwrap();
        let b = Timestamp::parse("2026-03-01T09:00:01Z").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_serde_roundtrip() {
        let ts = Timestamp::parse("2026-03-01T09:00:00Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }
}
