use crate::error::{MetricsError, Result};
use crate::model::DateRange;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use std::time::SystemTime;

/// UTC calendar day of a timestamp, the `YYYY-MM-DD` prefix of its ISO form.
pub fn day_key(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.with_timezone(&Utc).format("%Y-%m-%d").to_string()
}

/// Parses a commit date as emitted by `git log` (`%aI` or `--date=iso`).
pub fn parse_commit_date(input: &str) -> Result<DateTime<FixedOffset>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }

    // git --date=iso: "2024-01-01 09:00:00 +0200"
    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(dt);
    }

    // No offset given, read as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
    }

    Err(MetricsError::Validation(format!("Invalid commit date '{input}'")))
}

pub fn deserialize_commit_date<'de, D>(deserializer: D) -> std::result::Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_commit_date(&raw).map_err(serde::de::Error::custom)
}

/// Parses one end of a query range: RFC3339, `YYYY-MM-DD`, or a relative
/// duration such as `2 weeks ago` / `90days`.
pub fn parse_range_bound(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = parse_commit_date(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    // YYYY-MM-DD
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&datetime));
        }
    }

    let relative = input.strip_suffix("ago").unwrap_or(input).replace(' ', "");
    if let Ok(duration) = humantime::parse_duration(&relative) {
        let target = SystemTime::now()
            .checked_sub(duration)
            .ok_or_else(|| MetricsError::Validation(format!("Duration overflow for '{input}'")))?;
        return Ok(DateTime::<Utc>::from(target));
    }

    Err(MetricsError::Validation(format!("Invalid date '{input}'")))
}

pub fn resolve_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange> {
    let mut range = DateRange::new();

    let since = start.map(parse_range_bound).transpose()?;
    let until = end.map(parse_range_bound).transpose()?;

    if let (Some(s), Some(u)) = (since, until) {
        if s > u {
            return Err(MetricsError::Validation(format!(
                "Invalid range: start ({s}) is after end ({u})"
            )));
        }
    }

    if let Some(s) = since {
        range = range.with_since(s);
    }
    if let Some(u) = until {
        range = range.with_until(u);
    }

    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_strict_and_git_iso_dates() {
        let strict = parse_commit_date("2024-01-01T09:00:00+02:00").unwrap();
        let iso = parse_commit_date("2024-01-01 09:00:00 +0200").unwrap();
        assert_eq!(strict, iso);
        assert_eq!(strict.hour(), 9);

        let zulu = parse_commit_date("2024-01-01T22:00:00Z").unwrap();
        assert_eq!(zulu.offset().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(matches!(
            parse_commit_date("yesterday-ish"),
            Err(MetricsError::Validation(_))
        ));
    }

    #[test]
    fn day_key_uses_utc_calendar_day() {
        let late = parse_commit_date("2024-01-01T23:30:00-05:00").unwrap();
        assert_eq!(day_key(&late), "2024-01-02");
        let morning = parse_commit_date("2024-01-01T09:00:00Z").unwrap();
        assert_eq!(day_key(&morning), "2024-01-01");
    }

    #[test]
    fn range_bounds_accept_plain_days_and_relative_durations() {
        let day = parse_range_bound("2024-02-03").unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap());

        let relative = parse_range_bound("2 weeks ago").unwrap();
        assert!(relative < Utc::now());
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(resolve_range(Some("2024-02-01"), Some("2024-01-01")).is_err());
        let range = resolve_range(Some("2024-01-01"), None).unwrap();
        assert!(range.since.is_some());
        assert!(range.until.is_none());
    }
}
