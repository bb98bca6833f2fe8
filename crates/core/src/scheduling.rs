//! Pure scheduling and statistics-window helpers.
//!
//! No database access here; the repository layer calls into these for
//! appointment-date resolution, day boundaries, and rolling stat windows.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Hour of day used when only a calendar date (or nothing) was supplied.
const DEFAULT_HOUR: u32 = 12;

/// How far in the future a defaulted appointment lands.
const DEFAULT_OFFSET_DAYS: i64 = 2;

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0).expect("static time literal")
}

/// Resolve the date for an appointment created from a contact request.
///
/// Precedence: a pre-parsed timestamp wins; otherwise `raw` is parsed as
/// RFC 3339, `YYYY-MM-DD HH:MM`, or `YYYY-MM-DD` (noon); with no input at
/// all the appointment defaults to two days from `now` at 12:00.
///
/// A non-empty string that matches none of the formats is a `Validation`
/// error rather than a silent fall-through to the default.
pub fn resolve_appointment_date(
    explicit: Option<Timestamp>,
    raw: Option<&str>,
    now: Timestamp,
) -> Result<Timestamp, CoreError> {
    if let Some(date) = explicit {
        return Ok(date);
    }

    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        let date = (now + Duration::days(DEFAULT_OFFSET_DAYS)).date_naive();
        return Ok(date.and_time(noon()).and_utc());
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Ok(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(parsed.and_time(noon()).and_utc());
    }

    Err(CoreError::validation(format!(
        "unparseable appointment date '{raw}'; expected RFC 3339, \
         YYYY-MM-DD HH:MM, or YYYY-MM-DD"
    )))
}

/// Inclusive day boundaries for date-scoped appointment queries:
/// `[00:00:00, 23:59:59.999]`.
pub fn day_bounds(date: NaiveDate) -> (Timestamp, Timestamp) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end = date
        .and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).expect("static time literal"))
        .and_utc();
    (start, end)
}

// ---------------------------------------------------------------------------
// Statistics windows
// ---------------------------------------------------------------------------

/// Rolling window for request statistics. Anything other than the named
/// periods falls back to the 30-day default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Week,
    Month,
    Year,
    /// Default window when no period (or an unknown one) is requested.
    Days(i64),
}

impl StatsPeriod {
    pub const DEFAULT_DAYS: i64 = 30;

    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            Some("year") => Self::Year,
            _ => Self::Days(Self::DEFAULT_DAYS),
        }
    }

    /// Start of the window, counted back from `now`.
    pub fn window_start(self, now: Timestamp) -> Timestamp {
        let days = match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Year => 365,
            Self::Days(days) => days,
        };
        now - Duration::days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn explicit_timestamp_wins_over_raw() {
        let explicit = at(2026, 3, 1, 9, 30);
        let resolved =
            resolve_appointment_date(Some(explicit), Some("2026-05-05"), Utc::now()).unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn rfc3339_string_is_parsed() {
        let resolved =
            resolve_appointment_date(None, Some("2026-03-01T09:30:00Z"), Utc::now()).unwrap();
        assert_eq!(resolved, at(2026, 3, 1, 9, 30));
    }

    #[test]
    fn date_time_without_zone_is_parsed_as_utc() {
        let resolved =
            resolve_appointment_date(None, Some("2026-03-01 09:30"), Utc::now()).unwrap();
        assert_eq!(resolved, at(2026, 3, 1, 9, 30));
    }

    #[test]
    fn bare_date_lands_at_noon() {
        let resolved = resolve_appointment_date(None, Some("2026-03-01"), Utc::now()).unwrap();
        assert_eq!(resolved, at(2026, 3, 1, 12, 0));
    }

    #[test]
    fn missing_input_defaults_to_two_days_out_at_noon() {
        let now = at(2026, 3, 1, 17, 45);
        let resolved = resolve_appointment_date(None, None, now).unwrap();
        assert_eq!(resolved, at(2026, 3, 3, 12, 0));
    }

    #[test]
    fn blank_string_behaves_like_missing_input() {
        let now = at(2026, 3, 1, 8, 0);
        let resolved = resolve_appointment_date(None, Some("   "), now).unwrap();
        assert_eq!(resolved, at(2026, 3, 3, 12, 0));
    }

    #[test]
    fn junk_string_is_a_validation_error() {
        let err = resolve_appointment_date(None, Some("next tuesday"), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start, at(2026, 3, 1, 0, 0));
        assert!(end > at(2026, 3, 1, 23, 59));
        assert!(end < at(2026, 3, 2, 0, 0));
    }

    #[test]
    fn period_parsing_and_windows() {
        let now = at(2026, 3, 31, 12, 0);
        assert_eq!(
            StatsPeriod::from_param(Some("week")).window_start(now),
            at(2026, 3, 24, 12, 0)
        );
        assert_eq!(
            StatsPeriod::from_param(Some("year")).window_start(now),
            at(2025, 3, 31, 12, 0)
        );
        // Unknown period falls back to the 30-day default.
        assert_eq!(
            StatsPeriod::from_param(Some("quarter")).window_start(now),
            at(2026, 3, 1, 12, 0)
        );
        assert_eq!(
            StatsPeriod::from_param(None).window_start(now),
            at(2026, 3, 1, 12, 0)
        );
    }
}
