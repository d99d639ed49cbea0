//! Natural-language time expression parsing.
//!
//! [`parse`] turns the strings people and assistants actually send ("tomorrow
//! 5:00 PM", "2024-01-30T15:00:00", "14:30", "next monday 3pm") into an
//! offset-aware [`TimePoint`]. The caller supplies "now" and the anchor zone;
//! nothing here reads the system clock.
//!
//! # Grammar
//!
//! Rules are tried in order and the first match wins. Machine formats never
//! lose to loose phrasing because no human rule accepts a string that starts
//! with a date.
//!
//! 1. Keywords: `now`, `today`, `tomorrow`, `yesterday` (start of day).
//! 2. Relative day plus time: `tomorrow 5pm`, `today at 14:30`.
//!    Then `next <weekday> [time]` and `next week`. The day word must be
//!    followed by whitespace; `tomorrow5pm` does not match.
//! 3. ISO 8601 datetime: `2024-01-30T15:00:00`, optionally with `Z` or an
//!    offset. An explicit offset is kept as given.
//! 4. ISO date, space, time: `2024-01-30 15:00`. Then a bare `2024-01-30`.
//! 5. Bare time of day: `14:30`, `5:00 PM`, `5pm`, on `now`'s local date.
//!
//! A bare time that has already passed today is **not** moved to tomorrow.
//! Callers that want the next occurrence must supply an explicit date.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::error::{Result, SkillTimeError};
use crate::zone::{TimePoint, TimeZoneRef};

/// Resolve `expression` to an absolute instant.
///
/// # Arguments
///
/// * `expression`: The human or machine time string
/// * `now`: The reference instant relative expressions are anchored to
/// * `zone`: The zone wall-clock expressions are interpreted in
///
/// # Errors
///
/// Returns [`SkillTimeError::UnparsableTime`] when no rule matches, or
/// [`SkillTimeError::NonexistentLocalTime`] when a rule matches but the
/// wall-clock time is skipped by a DST transition in `zone`.
///
/// # Examples
///
/// ```
/// use skilltime::parse::parse;
/// use skilltime::zone::TimeZoneRef;
///
/// let zone = TimeZoneRef::named("America/New_York").unwrap();
/// let now = chrono::DateTime::parse_from_rfc3339("2024-01-30T10:00:00-05:00").unwrap();
/// let resolved = parse("tomorrow 5:00 PM", &now, &zone).unwrap();
/// assert_eq!(resolved.to_rfc3339(), "2024-01-31T17:00:00-05:00");
/// ```
pub fn parse(expression: &str, now: &TimePoint, zone: &TimeZoneRef) -> Result<TimePoint> {
    let raw = expression.trim();
    let normalized = normalize_expression(raw);
    let today = zone.local_date(now);

    try_keyword(&normalized, now, today, zone)
        .or_else(|| try_relative_day_time(&normalized, today, zone))
        .or_else(|| try_next_weekday(&normalized, today, zone))
        .or_else(|| try_iso_datetime(raw, zone))
        .or_else(|| try_iso_date_time(raw, zone))
        .or_else(|| try_iso_date(raw, zone))
        .or_else(|| try_time_of_day(&normalized, today, zone))
        .unwrap_or_else(|| Err(SkillTimeError::UnparsableTime(raw.to_string())))
}

/// Human-readable rendering, e.g. "Wednesday, January 31, 2024 at 5:00 PM EST".
pub fn interpretation(instant: &TimePoint, zone: &TimeZoneRef) -> String {
    instant
        .with_timezone(&zone.tz())
        .format("%A, %B %-d, %Y at %-I:%M %p %Z")
        .to_string()
}

// ── Rules ───────────────────────────────────────────────────────────────────

/// Rule 1: "now", "today", "tomorrow", "yesterday".
fn try_keyword(
    s: &str,
    now: &TimePoint,
    today: NaiveDate,
    zone: &TimeZoneRef,
) -> Option<Result<TimePoint>> {
    if s == "now" {
        return Some(Ok(zone.at(*now)));
    }
    let date = relative_day(s, today)?;
    Some(zone.start_of_day(date))
}

/// Rule 2: "<today|tomorrow|yesterday> [at] <time>".
fn try_relative_day_time(
    s: &str,
    today: NaiveDate,
    zone: &TimeZoneRef,
) -> Option<Result<TimePoint>> {
    let (day, rest) = s.split_once(' ')?;
    let date = relative_day(day, today)?;
    let time = parse_clock(strip_at(rest))?;
    Some(zone.localize(date.and_time(time)))
}

/// "next <weekday> [[at] <time>]" and "next week [[at] <time>]".
fn try_next_weekday(s: &str, today: NaiveDate, zone: &TimeZoneRef) -> Option<Result<TimePoint>> {
    let rest = s.strip_prefix("next ")?;
    let (target, time_part) = match rest.split_once(' ') {
        Some((target, time)) => (target, Some(time)),
        None => (rest, None),
    };

    let date = if target == "week" {
        today + Duration::days(7)
    } else {
        let weekday = parse_weekday(target)?;
        // Always in the future: the same weekday as today means a week ahead.
        let ahead = (weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64
            + 7)
            % 7;
        today + Duration::days(if ahead == 0 { 7 } else { ahead })
    };

    match time_part {
        Some(t) => {
            let time = parse_clock(strip_at(t))?;
            Some(zone.localize(date.and_time(time)))
        }
        None => Some(zone.start_of_day(date)),
    }
}

/// Rule 3: ISO 8601 datetime with a `T` separator.
fn try_iso_datetime(s: &str, zone: &TimeZoneRef) -> Option<Result<TimePoint>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Ok(dt));
    }
    // Offset present but seconds omitted: "2024-01-30T15:00-05:00".
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Some(Ok(dt));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| zone.localize(naive))
}

/// Rule 4: "YYYY-MM-DD <time>".
fn try_iso_date_time(s: &str, zone: &TimeZoneRef) -> Option<Result<TimePoint>> {
    let (date, time) = s.split_once(' ')?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = parse_clock(time)?;
    Some(zone.localize(date.and_time(time)))
}

/// Rule 4b: "YYYY-MM-DD" at start of day.
fn try_iso_date(s: &str, zone: &TimeZoneRef) -> Option<Result<TimePoint>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(zone.start_of_day(date))
}

/// Rule 5: a bare time on today's local date.
fn try_time_of_day(s: &str, today: NaiveDate, zone: &TimeZoneRef) -> Option<Result<TimePoint>> {
    let time = parse_clock(s)?;
    Some(zone.localize(today.and_time(time)))
}

// ── Parsing helpers ─────────────────────────────────────────────────────────

/// Lowercase, collapse runs of whitespace, and fold "p.m." into "pm".
fn normalize_expression(s: &str) -> String {
    s.to_lowercase()
        .replace("a.m.", "am")
        .replace("p.m.", "pm")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_at(s: &str) -> &str {
    s.strip_prefix("at ").unwrap_or(s)
}

fn relative_day(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    match s {
        "today" => Some(today),
        "tomorrow" => today.succ_opt(),
        "yesterday" => today.pred_opt(),
        _ => None,
    }
}

/// Parse a weekday name (full or abbreviated).
fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parse a time of day: "14:30", "14:30:15", "5:00 PM", "5pm", "5 pm".
///
/// Without a meridiem the minutes are required. With one, the hour must be 1-12
/// and the minutes default to `:00`.
fn parse_clock(s: &str) -> Option<NaiveTime> {
    let compact: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let (digits, is_pm) = if let Some(d) = compact.strip_suffix("pm") {
        (d, Some(true))
    } else if let Some(d) = compact.strip_suffix("am") {
        (d, Some(false))
    } else {
        (compact.as_str(), None)
    };

    let mut fields = digits.split(':');
    let hour = parse_field(fields.next()?, 1, 2)?;
    let minute = match fields.next() {
        Some(m) => parse_field(m, 2, 2)?,
        None if is_pm.is_some() => 0,
        None => return None,
    };
    let second = match fields.next() {
        Some(sec) => parse_field(sec, 2, 2)?,
        None => 0,
    };
    if fields.next().is_some() {
        return None;
    }

    let hour24 = match is_pm {
        None => hour,
        Some(_) if !(1..=12).contains(&hour) => return None,
        Some(true) if hour == 12 => 12,
        Some(true) => hour + 12,
        Some(false) if hour == 12 => 0,
        Some(false) => hour,
    };

    NaiveTime::from_hms_opt(hour24, minute, second)
}

fn parse_field(s: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if s.len() < min_len || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// ── Tests ───────────────────────────────────────────────────────────────────
