//! # skilltime
//!
//! Deterministic time handling for assistant skills.
//!
//! Language models are unreliable at turning "tomorrow 5pm" into an instant,
//! at finding gaps between meetings, and at remembering to do something after
//! the conversation ends. This crate does those parts with a resolved local
//! timezone and an explicit "now".
//!
//! ## Modules
//!
//! - [`zone`]: local timezone discovery with precedence and a UTC fallback
//! - [`parse`]: natural-language and ISO time expressions to absolute instants
//! - [`freeslot`]: free gaps between busy intervals in a window
//! - [`event`]: calendar event start/end resolution
//! - [`worldclock`]: zone lookup by place name
//! - [`trigger`]: one-shot OS scheduler entries (systemd timers, Task Scheduler)
//! - [`registry`]: SQLite-backed store of pending reminders and their triggers
//! - [`config`]: TOML settings
//! - [`skills`]: JSON-in/JSON-out skill entry points
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod event;
pub mod freeslot;
pub mod parse;
pub mod registry;
pub mod skills;
pub mod trigger;
pub mod worldclock;
pub mod zone;

pub use config::Settings;
pub use error::{Result, SkillTimeError};
pub use event::{resolve_event_window, CalendarEventDraft, EventWindow};
pub use freeslot::{compute, compute_from, find_first_free_slot, BusyInterval, FreeSlot};
pub use parse::{interpretation, parse};
pub use registry::{RegistryOptions, ScheduledAction, ScheduledActionRegistry};
pub use skills::{SkillContext, SkillExport};
pub use trigger::{
    DryRunScheduler, OneShotTrigger, SchedulerKind, SchtasksScheduler, SystemdScheduler,
    TriggerCommand, TriggerScheduler,
};
pub use worldclock::{clock_in, find_timezones, ZoneClock};
pub use zone::{TimePoint, TimeZoneRef, TimeZoneResolver, ZoneSource};
