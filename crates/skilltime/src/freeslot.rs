//! Free-slot computation over busy intervals.
//!
//! Given existing commitments and a search window, [`compute`] returns the
//! maximal free gaps that are at least a minimum duration long. Inputs are
//! taken as-is: intervals with `start >= end` are skipped, overlapping
//! intervals are absorbed by the sweep, and intervals outside the window are
//! ignored.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkillTimeError};
use crate::zone::TimePoint;

/// An existing commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: TimePoint,
    pub end: TimePoint,
}

impl BusyInterval {
    pub fn new(start: TimePoint, end: TimePoint) -> Self {
        Self { start, end }
    }

    /// `start < end`. Invalid intervals are dropped by [`compute`].
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    fn length(&self) -> Duration {
        self.end - self.start
    }

    fn overlaps(&self, start: &TimePoint, end: &TimePoint) -> bool {
        self.start < *end && self.end > *start
    }
}

/// A free gap of at least the requested duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeSlot {
    pub start: TimePoint,
    pub end: TimePoint,
    pub duration_minutes: i64,
}

impl FreeSlot {
    fn new(start: TimePoint, end: TimePoint, offset_of: &TimePoint) -> Self {
        let offset = *offset_of.offset();
        Self {
            start: start.with_timezone(&offset),
            end: end.with_timezone(&offset),
            duration_minutes: (end - start).num_minutes(),
        }
    }
}

/// Compute free slots in `[window_start, window_end]`.
///
/// Equivalent to [`compute_from`] with `now` at or before `window_start`.
///
/// # Errors
///
/// Returns [`SkillTimeError::InvalidWindow`] if `window_start >= window_end`,
/// or [`SkillTimeError::InvalidDuration`] if `min_duration` is negative.
pub fn compute(
    busy: &[BusyInterval],
    window_start: TimePoint,
    window_end: TimePoint,
    min_duration: Duration,
) -> Result<Vec<FreeSlot>> {
    compute_from(busy, window_start, window_end, min_duration, window_start)
}

/// Compute free slots in `[max(window_start, now), window_end]`.
///
/// Slots are disjoint, ordered by start, each at least `min_duration` long,
/// and expressed in `window_start`'s offset. Together with the busy time and
/// any gaps shorter than `min_duration` they cover the searched range exactly.
/// When `now` is at or past `window_end` the result is empty.
///
/// # Errors
///
/// Same as [`compute`].
pub fn compute_from(
    busy: &[BusyInterval],
    window_start: TimePoint,
    window_end: TimePoint,
    min_duration: Duration,
    now: TimePoint,
) -> Result<Vec<FreeSlot>> {
    if window_start >= window_end {
        return Err(SkillTimeError::InvalidWindow {
            start: window_start.to_rfc3339(),
            end: window_end.to_rfc3339(),
        });
    }
    if min_duration < Duration::zero() {
        return Err(SkillTimeError::InvalidDuration(format!(
            "minimum duration must not be negative, got {} minutes",
            min_duration.num_minutes()
        )));
    }

    let mut relevant: Vec<&BusyInterval> = busy
        .iter()
        .filter(|b| b.is_valid() && b.overlaps(&window_start, &window_end))
        .collect();
    // Equal starts: the shorter interval first, so its end frees time sooner.
    relevant.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.length().cmp(&b.length()))
    });

    let mut slots = Vec::new();
    let mut cursor = window_start.max(now);

    for interval in relevant {
        if fits(&cursor, &interval.start, min_duration) {
            slots.push(FreeSlot::new(cursor, interval.start, &window_start));
        }
        cursor = cursor.max(interval.end);
    }

    if fits(&cursor, &window_end, min_duration) {
        slots.push(FreeSlot::new(cursor, window_end, &window_start));
    }

    Ok(slots)
}

/// The earliest free slot of at least `min_duration`, if any.
///
/// # Errors
///
/// Same as [`compute`].
pub fn find_first_free_slot(
    busy: &[BusyInterval],
    window_start: TimePoint,
    window_end: TimePoint,
    min_duration: Duration,
) -> Result<Option<FreeSlot>> {
    Ok(compute(busy, window_start, window_end, min_duration)?
        .into_iter()
        .next())
}

/// Overflowing `from + min_duration` means the gap cannot fit.
fn fits(from: &TimePoint, to: &TimePoint, min_duration: Duration) -> bool {
    from < to
        && from
            .checked_add_signed(min_duration)
            .is_some_and(|earliest_end| earliest_end <= *to)
}
