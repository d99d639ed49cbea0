//! Effective timezone resolution.
//!
//! Every relative expression ("today", "5pm") needs an anchor zone. The
//! resolver always produces one: a configured name, the `TZ` environment
//! variable, or the zone reported by the operating system, in that order.
//! When none of those yields a valid IANA name the result is UTC, and the
//! returned [`TimeZoneRef`] says so through [`TimeZoneRef::is_fallback`].

use std::fmt;

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{Result, SkillTimeError};

// Transitions fall on quarter hours; checking every one in a day covers any gap.
const DAY_START_STEP_MINUTES: i64 = 15;
const DAY_START_CANDIDATES: i64 = 24 * 60 / DAY_START_STEP_MINUTES;

/// An absolute instant that always carries an explicit UTC offset.
///
/// Ordering and equality on `DateTime<FixedOffset>` compare the UTC instant,
/// so values with different offsets compare correctly.
pub type TimePoint = DateTime<FixedOffset>;

/// Where a [`TimeZoneRef`] came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneSource {
    /// The `timezone` setting in the configuration file.
    Configured,
    /// The `TZ` environment variable.
    Environment,
    /// The operating system's reported zone.
    Host,
    /// Nothing usable was found; UTC was substituted.
    Fallback { reason: String },
}

/// A resolved IANA timezone together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeZoneRef {
    tz: Tz,
    source: ZoneSource,
}

impl TimeZoneRef {
    pub fn new(tz: Tz, source: ZoneSource) -> Self {
        Self { tz, source }
    }

    /// Build a zone from an IANA name, marked as [`ZoneSource::Configured`].
    ///
    /// # Errors
    ///
    /// Returns [`SkillTimeError::InvalidTimezone`] if `name` is not a known IANA zone.
    pub fn named(name: &str) -> Result<Self> {
        let tz = parse_tz(name).map_err(|e| SkillTimeError::InvalidTimezone(e.0))?;
        Ok(Self::new(tz, ZoneSource::Configured))
    }

    /// The explicit UTC fallback.
    pub fn utc_fallback(reason: impl Into<String>) -> Self {
        Self::new(
            Tz::UTC,
            ZoneSource::Fallback {
                reason: reason.into(),
            },
        )
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    pub fn source(&self) -> &ZoneSource {
        &self.source
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ZoneSource::Fallback { .. })
    }

    /// The current instant expressed in this zone.
    pub fn now(&self) -> TimePoint {
        self.at(Utc::now())
    }

    /// Express an instant in this zone, keeping it offset-aware.
    pub fn at<T: TimeZone>(&self, instant: DateTime<T>) -> TimePoint {
        instant.with_timezone(&self.tz).fixed_offset()
    }

    /// Attach this zone to a wall-clock datetime.
    ///
    /// A wall-clock time inside a DST overlap resolves to the earlier of the
    /// two instants.
    ///
    /// # Errors
    ///
    /// Returns [`SkillTimeError::NonexistentLocalTime`] when the time falls in a
    /// DST gap.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<TimePoint> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt.fixed_offset()),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.fixed_offset()),
            LocalResult::None => Err(SkillTimeError::NonexistentLocalTime(
                naive.format("%Y-%m-%d %H:%M:%S").to_string(),
                self.name().to_string(),
            )),
        }
    }

    /// The first instant of `date` in this zone.
    ///
    /// Usually 00:00. Where a DST change skips midnight (America/Santiago,
    /// Asia/Beirut) the day starts when the gap ends.
    pub fn start_of_day(&self, date: NaiveDate) -> Result<TimePoint> {
        let midnight = date.and_time(NaiveTime::MIN);
        (0..DAY_START_CANDIDATES)
            .map(|step| midnight + Duration::minutes(DAY_START_STEP_MINUTES * step))
            .find_map(|naive| self.localize(naive).ok())
            .ok_or_else(|| {
                SkillTimeError::NonexistentLocalTime(
                    midnight.format("%Y-%m-%d %H:%M:%S").to_string(),
                    self.name().to_string(),
                )
            })
    }

    /// The local calendar date of `instant` in this zone.
    pub fn local_date(&self, instant: &TimePoint) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }
}

impl fmt::Display for TimeZoneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Resolver ────────────────────────────────────────────────────────────────

/// A zone source that could not provide a usable zone. Never leaves this module.
#[derive(Debug, Error)]
#[error("{0}")]
struct TimezoneUnavailable(String);

type HostLookup = fn() -> std::result::Result<String, TimezoneUnavailable>;

fn os_lookup() -> std::result::Result<String, TimezoneUnavailable> {
    iana_time_zone::get_timezone().map_err(|e| TimezoneUnavailable(e.to_string()))
}

fn parse_tz(name: &str) -> std::result::Result<Tz, TimezoneUnavailable> {
    // POSIX allows a leading ':' in TZ ("TZ=:America/New_York").
    let trimmed = name.trim().trim_start_matches(':');
    if trimmed.is_empty() {
        return Err(TimezoneUnavailable("empty timezone name".to_string()));
    }
    trimmed
        .parse::<Tz>()
        .map_err(|_| TimezoneUnavailable(format!("'{trimmed}' is not an IANA timezone")))
}

/// Determines the anchor zone for relative time expressions.
#[derive(Debug, Clone)]
pub struct TimeZoneResolver {
    configured: Option<String>,
    environment: Option<String>,
    host: HostLookup,
}

impl TimeZoneResolver {
    /// A resolver reading the `TZ` variable and the operating system.
    pub fn from_host() -> Self {
        Self {
            configured: None,
            environment: std::env::var("TZ").ok(),
            host: os_lookup,
        }
    }

    /// Prefer `name` over every host source.
    pub fn with_configured(mut self, name: Option<&str>) -> Self {
        self.configured = name.map(str::to_string);
        self
    }

    /// Replace the captured `TZ` value.
    pub fn with_environment(mut self, value: Option<&str>) -> Self {
        self.environment = value.map(str::to_string);
        self
    }

    /// Resolve the effective zone. Never fails.
    pub fn resolve(&self) -> TimeZoneRef {
        let mut last_failure = String::from("no timezone source available");

        let candidates = [
            (ZoneSource::Configured, self.configured.as_deref()),
            (ZoneSource::Environment, self.environment.as_deref()),
        ];
        for (source, value) in candidates {
            let Some(value) = value else { continue };
            match parse_tz(value) {
                Ok(tz) => {
                    debug!(zone = tz.name(), ?source, "resolved timezone");
                    return TimeZoneRef::new(tz, source);
                }
                Err(err) => {
                    warn!(?source, error = %err, "ignoring unusable timezone");
                    last_failure = err.to_string();
                }
            }
        }

        match (self.host)().and_then(|name| parse_tz(&name)) {
            Ok(tz) => {
                debug!(zone = tz.name(), "resolved timezone from host");
                TimeZoneRef::new(tz, ZoneSource::Host)
            }
            Err(err) => {
                warn!(error = %err, "host timezone unavailable, falling back to UTC");
                if self.configured.is_none() && self.environment.is_none() {
                    last_failure = err.to_string();
                } else {
                    last_failure = format!("{last_failure}; host: {err}");
                }
                TimeZoneRef::utc_fallback(last_failure)
            }
        }
    }
}

impl Default for TimeZoneResolver {
    fn default() -> Self {
        Self::from_host()
    }
}
