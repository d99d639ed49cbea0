//! Calendar event time windows.
//!
//! Calendar skills take a start expression and an optional end expression.
//! A missing end means "one default duration after the start".

use chrono::Duration;
use serde::Serialize;

use crate::error::{Result, SkillTimeError};
use crate::parse::parse;
use crate::zone::{TimePoint, TimeZoneRef};

/// Resolved start and end of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventWindow {
    pub start: TimePoint,
    pub end: TimePoint,
    pub timezone: String,
}

/// Resolve an event's start and end.
///
/// # Errors
///
/// Any parse error from either expression, or
/// [`SkillTimeError::InvalidWindow`] if the end is not after the start.
pub fn resolve_event_window(
    start: &str,
    end: Option<&str>,
    now: &TimePoint,
    zone: &TimeZoneRef,
    default_duration: Duration,
) -> Result<EventWindow> {
    let start = parse(start, now, zone)?;
    let end = match end.map(str::trim).filter(|e| !e.is_empty()) {
        Some(expr) => parse(expr, now, zone)?,
        None => start.checked_add_signed(default_duration).ok_or_else(|| {
            SkillTimeError::InvalidDuration(format!(
                "event length of {} minutes is out of range",
                default_duration.num_minutes()
            ))
        })?,
    };
    if end <= start {
        return Err(SkillTimeError::InvalidWindow {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok(EventWindow {
        start,
        end,
        timezone: zone.name().to_string(),
    })
}

/// The event body a calendar API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventDraft {
    pub summary: String,
    pub start_time: String,
    pub end_time: String,
    pub time_zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CalendarEventDraft {
    pub fn new(summary: &str, window: &EventWindow, description: Option<&str>) -> Self {
        Self {
            summary: summary.to_string(),
            start_time: window.start.to_rfc3339(),
            end_time: window.end.to_rfc3339(),
            time_zone: window.timezone.clone(),
            description: description.map(str::to_string),
        }
    }
}
