//! Error types for skilltime operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillTimeError {
    #[error("Unparsable time: '{0}'")]
    UnparsableTime(String),

    #[error("Cannot schedule in the past: {fire_at} is not after {now}")]
    PastTime { fire_at: String, now: String },

    #[error("Invalid window: start {start} must be before end {end}")]
    InvalidWindow { start: String, end: String },

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Local time {0} does not exist in {1}")]
    NonexistentLocalTime(String, String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Trigger error: {0}")]
    Trigger(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SkillTimeError>;
