//! Zone lookup by place name and the current time there.

use chrono::{DateTime, TimeZone};
use chrono_tz::{Tz, TZ_VARIANTS};
use serde::Serialize;

/// Wall-clock time in one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneClock {
    /// IANA zone name.
    pub timezone: String,
    /// 12-hour time, e.g. "05:00 PM".
    pub time: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// e.g. "+09:00".
    pub utc_offset: String,
}

/// Every IANA zone matching a city, region or zone-name query.
///
/// Matching is case-insensitive. A zone matches if its full name contains the
/// query, or if any `/`-separated part does once underscores are read as
/// spaces ("new york" finds "America/New_York").
pub fn find_timezones(query: &str) -> Vec<Tz> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    TZ_VARIANTS
        .iter()
        .copied()
        .filter(|tz| {
            let name = tz.name().to_lowercase();
            name.contains(&query) || name.replace('_', " ").split('/').any(|part| part.contains(&query))
        })
        .collect()
}

/// The wall-clock time in `tz` at `instant`.
pub fn clock_in<T: TimeZone>(tz: Tz, instant: &DateTime<T>) -> ZoneClock {
    let local = instant.with_timezone(&tz);
    ZoneClock {
        timezone: tz.name().to_string(),
        time: local.format("%I:%M %p").to_string(),
        date: local.format("%Y-%m-%d").to_string(),
        utc_offset: local.format("%:z").to_string(),
    }
}
