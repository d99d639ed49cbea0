//! Durable record of pending one-shot reminders.
//!
//! Each [`ScheduledAction`] is one row in a SQLite table and one trigger in the
//! OS scheduler, correlated by name (`<prefix><id>`). Creating a row and its
//! trigger happens inside a single immediate transaction: if the trigger
//! cannot be created the row is rolled back. Cancellation removes rows first
//! and then revokes triggers best-effort.
//!
//! Rows and live triggers can drift apart (a trigger fires, or someone deletes
//! it by hand). The registry does not try to detect or repair that.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::DateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, SkillTimeError};
use crate::trigger::{OneShotTrigger, TriggerCommand, TriggerScheduler};
use crate::zone::{TimePoint, TimeZoneRef};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS scheduled_actions (
    id          TEXT PRIMARY KEY,
    message     TEXT NOT NULL,
    fire_at     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
";

const BUSY_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// A pending reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledAction {
    pub id: String,
    pub message: String,
    pub fire_at: TimePoint,
    pub created_at: TimePoint,
}

/// How triggers are named and what they run.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Prepended to the action id to form the trigger name.
    pub trigger_prefix: String,
    /// Program run when a trigger fires.
    pub command: TriggerCommand,
    /// Zone used for "now" and for the trigger's wall-clock time.
    pub zone: TimeZoneRef,
}

/// The single writer of the scheduled-action store.
pub struct ScheduledActionRegistry {
    conn: Mutex<Connection>,
    scheduler: Box<dyn TriggerScheduler>,
    options: RegistryOptions,
}

impl ScheduledActionRegistry {
    /// Open (creating if needed) the store at `path`.
    pub fn open(
        path: &Path,
        scheduler: Box<dyn TriggerScheduler>,
        options: RegistryOptions,
    ) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, scheduler, options)
    }

    /// A registry backed by a private in-memory database.
    pub fn open_in_memory(
        scheduler: Box<dyn TriggerScheduler>,
        options: RegistryOptions,
    ) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, scheduler, options)
    }

    fn with_connection(
        conn: Connection,
        scheduler: Box<dyn TriggerScheduler>,
        options: RegistryOptions,
    ) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            scheduler,
            options,
        })
    }

    pub fn zone(&self) -> &TimeZoneRef {
        &self.options.zone
    }

    /// The OS trigger name for action `id`.
    pub fn trigger_name(&self, id: &str) -> String {
        format!("{}{}", self.options.trigger_prefix, id)
    }

    /// Schedule `message` at `fire_at`, measured against the current time.
    pub fn schedule(&self, message: &str, fire_at: TimePoint) -> Result<ScheduledAction> {
        self.schedule_at(message, fire_at, self.options.zone.now())
    }

    /// Schedule `message` at `fire_at`, with `now` supplied by the caller.
    ///
    /// # Errors
    ///
    /// - [`SkillTimeError::PastTime`] if `fire_at <= now`
    /// - [`SkillTimeError::InvalidInput`] if `message` is blank
    /// - [`SkillTimeError::Trigger`] if the OS trigger cannot be created; nothing is persisted
    /// - [`SkillTimeError::Store`] if the row cannot be written
    pub fn schedule_at(
        &self,
        message: &str,
        fire_at: TimePoint,
        now: TimePoint,
    ) -> Result<ScheduledAction> {
        if message.trim().is_empty() {
            return Err(SkillTimeError::InvalidInput(
                "reminder message must not be empty".to_string(),
            ));
        }
        if fire_at <= now {
            return Err(SkillTimeError::PastTime {
                fire_at: fire_at.to_rfc3339(),
                now: now.to_rfc3339(),
            });
        }

        let action = ScheduledAction {
            id: Uuid::new_v4().simple().to_string(),
            message: message.to_string(),
            fire_at,
            created_at: now,
        };
        let trigger = self.trigger_for(&action);

        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO scheduled_actions (id, message, fire_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                action.id,
                action.message,
                action.fire_at.to_rfc3339(),
                action.created_at.to_rfc3339()
            ],
        )?;

        // Dropping `tx` on the error path rolls the insert back.
        self.scheduler.create(&trigger)?;

        if let Err(err) = tx.commit() {
            warn!(id = %action.id, error = %err, "commit failed after trigger creation");
            self.revoke(&action.id);
            return Err(err.into());
        }

        info!(
            id = %action.id,
            trigger = %trigger.name,
            fire_at = %action.fire_at.to_rfc3339(),
            "scheduled action"
        );
        Ok(action)
    }

    /// Cancel one action. Returns `false` if `id` is unknown.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM scheduled_actions WHERE id = ?1", params![id])?;
        tx.commit()?;

        if removed == 0 {
            return Ok(false);
        }
        self.revoke(id);
        info!(id, "cancelled action");
        Ok(true)
    }

    /// Cancel every action. Returns how many rows were removed.
    pub fn cancel_all(&self) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let ids = {
            let mut stmt = tx.prepare("SELECT id FROM scheduled_actions")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.execute("DELETE FROM scheduled_actions", [])?;
        tx.commit()?;

        for id in &ids {
            self.revoke(id);
        }
        info!(count = ids.len(), "cancelled all actions");
        Ok(ids.len())
    }

    /// All pending actions, earliest `fire_at` first.
    pub fn list(&self) -> Result<Vec<ScheduledAction>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT id, message, fire_at, created_at FROM scheduled_actions")?;
        let rows = stmt.query_map([], action_from_row)?;
        let mut actions = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        actions.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        Ok(actions)
    }

    pub fn get(&self, id: &str) -> Result<Option<ScheduledAction>> {
        let conn = self.lock();
        let action = conn
            .query_row(
                "SELECT id, message, fire_at, created_at FROM scheduled_actions WHERE id = ?1",
                params![id],
                action_from_row,
            )
            .optional()?;
        Ok(action)
    }

    fn trigger_for(&self, action: &ScheduledAction) -> OneShotTrigger {
        OneShotTrigger {
            name: self.trigger_name(&action.id),
            argv: self.options.command.argv(&action.message),
            run_at: self.options.zone.at(action.fire_at),
        }
    }

    /// Best-effort trigger removal; failures are logged and dropped.
    fn revoke(&self, id: &str) {
        let name = self.trigger_name(id);
        if let Err(err) = self.scheduler.delete(&name) {
            warn!(
                id,
                trigger = %name,
                error = %err,
                "could not revoke trigger (it may have fired already)"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // An open transaction is rolled back when its guard unwinds, so the
        // connection is still consistent after a panic elsewhere.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledAction> {
    Ok(ScheduledAction {
        id: row.get(0)?,
        message: row.get(1)?,
        fire_at: timestamp_column(row, 2)?,
        created_at: timestamp_column(row, 3)?,
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<TimePoint> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
