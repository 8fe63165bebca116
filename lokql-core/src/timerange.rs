//! Parsing of time bounds for range queries.
//!
//! The model (and the user) may hand us absolute timestamps or loose
//! relative offsets like `"1h ago"`. Everything resolves against a single
//! `now` instant so a window is internally consistent.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use lokql_error::{Error, Result};

/// A resolved start/end window, always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Resolve optional start/end strings into a window.
    ///
    /// Defaults: start one hour before `now`, end at `now`.
    pub fn resolve(start: Option<&str>, end: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let end = match end {
            Some(raw) => parse_instant(raw, now)?,
            None => now,
        };
        let start = match start {
            Some(raw) => parse_instant(raw, now)?,
            None => now - Duration::hours(1),
        };

        if start > end {
            return Err(Error::invalid_argument(format!(
                "start ({}) is after end ({})",
                start.to_rfc3339(),
                end.to_rfc3339()
            ))
            .with_operation("timerange::resolve"));
        }

        Ok(Self { start, end })
    }

    /// Start bound as a nanosecond epoch string (Loki's native unit).
    pub fn start_ns(&self) -> String {
        to_nanos(self.start).to_string()
    }

    /// End bound as a nanosecond epoch string.
    pub fn end_ns(&self) -> String {
        to_nanos(self.end).to_string()
    }
}

fn to_nanos(instant: DateTime<Utc>) -> i64 {
    // timestamp_nanos_opt only fails outside ~1677..2262, which no log
    // query window reaches; saturate instead of panicking.
    instant.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Parse a single instant.
///
/// Accepted forms:
/// - `"now"`, `"now-1h"`
/// - `"1h ago"`, `"30 minutes ago"`, bare offsets like `"2h"`
/// - RFC 3339 (`2024-05-01T12:00:00Z`), `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`
/// - Unix epoch seconds, milliseconds, or nanoseconds
pub fn parse_instant(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(invalid(input));
    }

    if raw.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Some(rest) = raw.strip_prefix("now-").or_else(|| raw.strip_prefix("now - ")) {
        return Ok(now - parse_duration(rest).ok_or_else(|| invalid(input))?);
    }

    let lowered = raw.to_ascii_lowercase();
    if let Some(rest) = lowered.strip_suffix("ago") {
        return Ok(now - parse_duration(rest.trim()).ok_or_else(|| invalid(input))?);
    }

    // Bare numbers are epoch timestamps; pick the unit by magnitude.
    if let Ok(value) = raw.parse::<i64>() {
        return epoch_to_instant(value).ok_or_else(|| invalid(input));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    // Last resort: a bare duration ("2h") means that far back from now.
    if let Some(duration) = parse_duration(raw) {
        return Ok(now - duration);
    }

    Err(invalid(input))
}

fn invalid(input: &str) -> Error {
    Error::invalid_argument(format!("unrecognized time '{}'", input))
        .with_operation("timerange::parse_instant")
}

fn epoch_to_instant(value: i64) -> Option<DateTime<Utc>> {
    // Heuristic thresholds: seconds until ~year 33658, then millis, then nanos.
    if value.abs() < 1_000_000_000_000 {
        DateTime::from_timestamp(value, 0)
    } else if value.abs() < 1_000_000_000_000_000 {
        DateTime::from_timestamp_millis(value)
    } else {
        Some(DateTime::from_timestamp_nanos(value))
    }
}

/// Parse `"90s"`, `"15m"`, `"2 hours"`, `"1 day"` into a duration.
fn parse_duration(input: &str) -> Option<Duration> {
    let raw = input.trim().to_ascii_lowercase();
    let digits_end = raw.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let amount: i64 = raw[..digits_end].parse().ok()?;
    let unit = raw[digits_end..].trim();

    let duration = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Duration::seconds(amount),
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::minutes(amount),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::hours(amount),
        "d" | "day" | "days" => Duration::days(amount),
        "w" | "week" | "weeks" => Duration::weeks(amount),
        _ => return None,
    };
    Some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_now_keyword() {
        assert_eq!(parse_instant("now", now()).unwrap(), now());
        assert_eq!(parse_instant("NOW", now()).unwrap(), now());
    }

    #[test]
    fn test_relative_offsets() {
        let expected = now() - Duration::hours(1);
        assert_eq!(parse_instant("1h ago", now()).unwrap(), expected);
        assert_eq!(parse_instant("now-1h", now()).unwrap(), expected);
        assert_eq!(parse_instant("1h", now()).unwrap(), expected);
        assert_eq!(parse_instant("60 minutes ago", now()).unwrap(), expected);
    }

    #[test]
    fn test_absolute_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_instant("2024-05-01T10:30:00Z", now()).unwrap(), expected);
        assert_eq!(parse_instant("2024-05-01 10:30:00", now()).unwrap(), expected);

        let midnight = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_instant("2024-05-01", now()).unwrap(), midnight);
    }

    #[test]
    fn test_epoch_units() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        let secs = instant.timestamp();
        let nanos = instant.timestamp_nanos_opt().unwrap();
        assert_eq!(parse_instant(&secs.to_string(), now()).unwrap(), instant);
        assert_eq!(parse_instant(&nanos.to_string(), now()).unwrap(), instant);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_instant("yesterdayish", now()).is_err());
        assert!(parse_instant("", now()).is_err());
        assert!(parse_instant("12 parsecs ago", now()).is_err());
    }

    #[test]
    fn test_window_defaults() {
        let window = TimeWindow::resolve(None, None, now()).unwrap();
        assert_eq!(window.end, now());
        assert_eq!(window.start, now() - Duration::hours(1));
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        let err = TimeWindow::resolve(Some("now"), Some("2h ago"), now()).unwrap_err();
        assert_eq!(err.kind(), lokql_error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_window_nanosecond_bounds() {
        let window = TimeWindow::resolve(Some("1h ago"), Some("now"), now()).unwrap();
        let start: i64 = window.start_ns().parse().unwrap();
        let end: i64 = window.end_ns().parse().unwrap();
        assert_eq!(end - start, 3_600_000_000_000);
    }
}
