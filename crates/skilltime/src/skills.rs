//! The skill boundary exposed to the host assistant runtime.
//!
//! Each skill takes a JSON argument object and returns a JSON string. Errors
//! never cross this boundary as anything but `{"error": "<message>"}`.
//!
//! # Skills
//!
//! - `notification_setter`: set, cancel or list one-shot reminders
//! - `calendar_event`: resolve event start/end into a calendar API body
//! - `free_slots`: free gaps between busy intervals
//! - `world_clock`: current time in zones matching a place name
//! - `resolve_time`: resolve one time expression

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{Result, SkillTimeError};
use crate::event::{resolve_event_window, CalendarEventDraft};
use crate::freeslot::{compute_from, BusyInterval};
use crate::parse::{interpretation, parse};
use crate::registry::ScheduledActionRegistry;
use crate::worldclock::{clock_in, find_timezones};
use crate::zone::{TimePoint, TimeZoneRef};

pub const NOTIFICATION_SETTER: &str = "notification_setter";
pub const CALENDAR_EVENT: &str = "calendar_event";
pub const FREE_SLOTS: &str = "free_slots";
pub const WORLD_CLOCK: &str = "world_clock";
pub const RESOLVE_TIME: &str = "resolve_time";

const DEFAULT_MIN_MINUTES: i64 = 30;

/// Everything a skill invocation may use. Built per request by the host.
pub struct SkillContext<'a> {
    pub now: TimePoint,
    pub zone: TimeZoneRef,
    pub settings: &'a Settings,
    /// Present only for skills that need the reminder store.
    pub registry: Option<&'a ScheduledActionRegistry>,
}

/// A skill's exported description, in the host's function-schema format.
#[derive(Debug, Clone, Serialize)]
pub struct SkillExport {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Whether `name` needs [`SkillContext::registry`].
pub fn uses_registry(name: &str) -> bool {
    name == NOTIFICATION_SETTER
}

/// Run skill `name` with `args`. Always returns a JSON string.
pub fn run(name: &str, args: &Value, ctx: &SkillContext<'_>) -> String {
    info!(skill = name, zone = ctx.zone.name(), "running skill");

    let result = if !args.is_object() {
        Err(SkillTimeError::InvalidInput(
            "arguments must be a JSON object".to_string(),
        ))
    } else {
        match name {
            NOTIFICATION_SETTER => notification_setter(args, ctx),
            CALENDAR_EVENT => calendar_event(args, ctx),
            FREE_SLOTS => free_slots(args, ctx),
            WORLD_CLOCK => world_clock(args, ctx),
            RESOLVE_TIME => resolve_time(args, ctx),
            other => Err(SkillTimeError::InvalidInput(format!("Unknown skill: {other}"))),
        }
    };

    match result {
        Ok(value) => value.to_string(),
        Err(err) => {
            warn!(skill = name, error = %err, "skill failed");
            error_json(&err.to_string())
        }
    }
}

/// `{"error": message}` as a string.
pub fn error_json(message: &str) -> String {
    json!({ "error": message }).to_string()
}

// ── notification_setter ─────────────────────────────────────────────────────

fn notification_setter(args: &Value, ctx: &SkillContext<'_>) -> Result<Value> {
    let operation = required_str(args, "operation")?;
    let registry = ctx.registry.ok_or_else(|| {
        SkillTimeError::InvalidInput("reminder store is not available".to_string())
    })?;

    match operation {
        "set" => {
            let message = required_str(args, "message")?;
            let time = required_str(args, "time")?;
            let fire_at = parse(time, &ctx.now, &ctx.zone)?;
            let action = registry.schedule_at(message, fire_at, ctx.now)?;
            let local = ctx.zone.at(action.fire_at);
            Ok(json!({
                "message": format!("Notification scheduled for {}", local.format("%Y-%m-%d %H:%M")),
                "id": action.id,
                "fire_at": action.fire_at.to_rfc3339(),
                "timezone": ctx.zone.name(),
                "timezone_fallback": ctx.zone.is_fallback(),
            }))
        }
        "cancel" => match optional_str(args, "id") {
            Some(id) => {
                let cancelled = registry.cancel(id)?;
                let message = if cancelled {
                    format!("Notification {id} cancelled")
                } else {
                    format!("No pending notification with id {id}")
                };
                Ok(json!({ "message": message, "cancelled": usize::from(cancelled) }))
            }
            None => {
                let count = registry.cancel_all()?;
                Ok(json!({ "message": "All notifications cancelled", "cancelled": count }))
            }
        },
        "list" => Ok(json!({ "notifications": registry.list()? })),
        other => Err(SkillTimeError::InvalidInput(format!(
            "Unknown operation: {other}"
        ))),
    }
}

// ── calendar_event ──────────────────────────────────────────────────────────

fn calendar_event(args: &Value, ctx: &SkillContext<'_>) -> Result<Value> {
    let summary = required_str(args, "summary")?;
    let start = required_str(args, "start_time")?;
    let window = resolve_event_window(
        start,
        optional_str(args, "end_time"),
        &ctx.now,
        &ctx.zone,
        ctx.settings.default_event_duration(),
    )?;
    let draft = CalendarEventDraft::new(summary, &window, optional_str(args, "description"));
    Ok(json!({
        "success": true,
        "event": draft,
        "timezone_fallback": ctx.zone.is_fallback(),
    }))
}

// ── free_slots ──────────────────────────────────────────────────────────────

fn free_slots(args: &Value, ctx: &SkillContext<'_>) -> Result<Value> {
    let window_start = parse(required_str(args, "window_start")?, &ctx.now, &ctx.zone)?;
    let window_end = parse(required_str(args, "window_end")?, &ctx.now, &ctx.zone)?;
    let min_minutes = match args.get("min_minutes") {
        None | Some(Value::Null) => DEFAULT_MIN_MINUTES,
        Some(v) => v.as_i64().ok_or_else(|| {
            SkillTimeError::InvalidInput("'min_minutes' must be an integer".to_string())
        })?,
    };
    let min_duration = Duration::try_minutes(min_minutes).ok_or_else(|| {
        SkillTimeError::InvalidInput(format!("'min_minutes' is out of range: {min_minutes}"))
    })?;

    let busy = match args.get("busy") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| busy_interval(item, ctx))
            .collect::<Result<Vec<_>>>()?,
        Some(_) => {
            return Err(SkillTimeError::InvalidInput(
                "'busy' must be a list of {start, end} objects".to_string(),
            ))
        }
    };

    let slots = compute_from(
        &busy,
        window_start,
        window_end,
        min_duration,
        ctx.now,
    )?;
    Ok(json!({ "slots": slots, "timezone": ctx.zone.name() }))
}

fn busy_interval(item: &Value, ctx: &SkillContext<'_>) -> Result<BusyInterval> {
    let start = parse(required_str(item, "start")?, &ctx.now, &ctx.zone)?;
    let end = parse(required_str(item, "end")?, &ctx.now, &ctx.zone)?;
    Ok(BusyInterval::new(start, end))
}

// ── world_clock ─────────────────────────────────────────────────────────────

fn world_clock(args: &Value, ctx: &SkillContext<'_>) -> Result<Value> {
    let location = required_str(args, "location")?.trim();
    if location.is_empty() {
        return Err(SkillTimeError::InvalidInput(
            "Please specify a location".to_string(),
        ));
    }

    let instant = ctx.now.with_timezone(&Utc);
    let results: Vec<_> = find_timezones(location)
        .into_iter()
        .map(|tz| clock_in(tz, &instant))
        .collect();

    match results.as_slice() {
        [] => Err(SkillTimeError::InvalidInput(format!(
            "Could not find timezone for {location}"
        ))),
        [only] => Ok(json!({
            "message": format!("Time in {}: {} ({})", only.timezone, only.time, only.date),
            "results": results,
        })),
        _ => Ok(json!({
            "message": format!("Found {} matching locations:", results.len()),
            "results": results,
        })),
    }
}

// ── resolve_time ────────────────────────────────────────────────────────────

fn resolve_time(args: &Value, ctx: &SkillContext<'_>) -> Result<Value> {
    let expression = required_str(args, "expression")?;
    let resolved = parse(expression, &ctx.now, &ctx.zone)?;
    Ok(json!({
        "resolved": resolved.to_rfc3339(),
        "utc": resolved.with_timezone(&Utc).to_rfc3339(),
        "timezone": ctx.zone.name(),
        "timezone_fallback": ctx.zone.is_fallback(),
        "interpretation": interpretation(&resolved, &ctx.zone),
    }))
}

// ── Argument helpers ────────────────────────────────────────────────────────

fn required_str<'v>(args: &'v Value, key: &str) -> Result<&'v str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SkillTimeError::InvalidInput(format!("Missing '{key}' argument")))
}

fn optional_str<'v>(args: &'v Value, key: &str) -> Option<&'v str> {
    args.get(key).and_then(Value::as_str)
}

// ── Exports ─────────────────────────────────────────────────────────────────

/// Schemas for every skill.
pub fn exports() -> Vec<SkillExport> {
    vec![
        SkillExport {
            name: NOTIFICATION_SETTER,
            description: "Schedule one-shot desktop reminders that survive restarts, cancel them, or list pending ones",
            parameters: json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["set", "cancel", "list"],
                        "description": "Set a new reminder, cancel one (with id) or all, or list pending reminders"
                    },
                    "message": {
                        "type": "string",
                        "description": "Message to display when the reminder fires"
                    },
                    "time": {
                        "type": "string",
                        "description": "When to fire, e.g. '17:30', 'tomorrow 9am', '2024-01-30 15:00'"
                    },
                    "id": {
                        "type": "string",
                        "description": "Reminder id to cancel; omit to cancel all"
                    }
                },
                "required": ["operation"]
            }),
        },
        SkillExport {
            name: CALENDAR_EVENT,
            description: "Resolve calendar event times in your local timezone into a calendar API event body",
            parameters: json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "Event title/summary"
                    },
                    "start_time": {
                        "type": "string",
                        "description": "Start in natural language or ISO format (e.g., 'tomorrow 5:00 PM' or '2024-01-30T15:00:00')"
                    },
                    "end_time": {
                        "type": "string",
                        "description": "End in natural language or ISO format. Defaults to the configured event length after start_time."
                    },
                    "description": {
                        "type": "string",
                        "description": "Event description"
                    }
                },
                "required": ["summary", "start_time"]
            }),
        },
        SkillExport {
            name: FREE_SLOTS,
            description: "Find free time between busy intervals within a window",
            parameters: json!({
                "type": "object",
                "properties": {
                    "busy": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "start": { "type": "string" },
                                "end": { "type": "string" }
                            },
                            "required": ["start", "end"]
                        },
                        "description": "Existing commitments"
                    },
                    "window_start": {
                        "type": "string",
                        "description": "Start of the search window"
                    },
                    "window_end": {
                        "type": "string",
                        "description": "End of the search window"
                    },
                    "min_minutes": {
                        "type": "integer",
                        "description": "Shortest useful slot in minutes (default 30)"
                    }
                },
                "required": ["window_start", "window_end"]
            }),
        },
        SkillExport {
            name: WORLD_CLOCK,
            description: "Get current time in any location. Examples: 'Tokyo', 'London', 'New York'",
            parameters: json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "City, country, or timezone name"
                    }
                },
                "required": ["location"]
            }),
        },
        SkillExport {
            name: RESOLVE_TIME,
            description: "Resolve a time expression like 'tomorrow 5pm' to an exact timestamp",
            parameters: json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "Time expression to resolve"
                    }
                },
                "required": ["expression"]
            }),
        },
    ]
}
