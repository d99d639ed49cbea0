//! Tests for free-slot computation over a working day.

use chrono::{Duration, FixedOffset, TimeZone};
use skilltime::freeslot::{compute, compute_from, find_first_free_slot, BusyInterval};
use skilltime::zone::TimePoint;
use skilltime::SkillTimeError;

fn at(day: u32, hour: u32, min: u32) -> TimePoint {
    FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, day, hour, min, 0)
        .unwrap()
}

/// Busy block from hour ranges on a given day.
fn busy(day: u32, start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> BusyInterval {
    BusyInterval::new(at(day, start_hour, start_min), at(day, end_hour, end_min))
}

#[test]
fn single_busy_block_produces_two_slots() {
    // Window: 08:00-17:00, busy: 10:00-11:00
    let slots = compute(
        &[busy(30, 10, 0, 11, 0)],
        at(30, 8, 0),
        at(30, 17, 0),
        Duration::minutes(30),
    )
    .unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].start, at(30, 8, 0));
    assert_eq!(slots[0].end, at(30, 10, 0));
    assert_eq!(slots[0].duration_minutes, 120);
    assert_eq!(slots[1].start, at(30, 11, 0));
    assert_eq!(slots[1].end, at(30, 17, 0));
    assert_eq!(slots[1].duration_minutes, 360);
}

#[test]
fn overlapping_busy_blocks_merge() {
    // 10:00-11:30 and 11:00-12:00 behave as 10:00-12:00
    let slots = compute(
        &[busy(30, 11, 0, 12, 0), busy(30, 10, 0, 11, 30)],
        at(30, 8, 0),
        at(30, 17, 0),
        Duration::minutes(30),
    )
    .unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].end, at(30, 10, 0));
    assert_eq!(slots[1].start, at(30, 12, 0));
    assert_eq!(slots[1].duration_minutes, 300);
}

#[test]
fn contained_block_does_not_reopen_time() {
    // 10:00-14:00 contains 11:00-12:00
    let slots = compute(
        &[busy(30, 10, 0, 14, 0), busy(30, 11, 0, 12, 0)],
        at(30, 8, 0),
        at(30, 17, 0),
        Duration::minutes(30),
    )
    .unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[1].start, at(30, 14, 0));
}

#[test]
fn adjacent_blocks_leave_no_gap() {
    let slots = compute(
        &[busy(30, 9, 0, 10, 0), busy(30, 10, 0, 11, 0)],
        at(30, 9, 0),
        at(30, 12, 0),
        Duration::zero(),
    )
    .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, at(30, 11, 0));
    assert_eq!(slots[0].end, at(30, 12, 0));
}

#[test]
fn short_gaps_are_dropped() {
    // 20 minutes free between blocks, minimum 30
    let slots = compute(
        &[busy(30, 9, 0, 10, 0), busy(30, 10, 20, 12, 0)],
        at(30, 9, 0),
        at(30, 12, 0),
        Duration::minutes(30),
    )
    .unwrap();

    assert!(slots.is_empty());
}

#[test]
fn gap_exactly_minimum_is_kept() {
    let slots = compute(
        &[busy(30, 9, 0, 10, 0)],
        at(30, 9, 0),
        at(30, 10, 30),
        Duration::minutes(30),
    )
    .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].duration_minutes, 30);
}

#[test]
fn busy_outside_window_is_ignored() {
    let slots = compute(
        &[busy(29, 9, 0, 18, 0), busy(31, 9, 0, 18, 0)],
        at(30, 9, 0),
        at(30, 17, 0),
        Duration::minutes(30),
    )
    .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].duration_minutes, 480);
}

#[test]
fn busy_straddling_window_edges_is_clipped() {
    let slots = compute(
        &[busy(30, 7, 0, 9, 0), busy(30, 16, 0, 19, 0)],
        at(30, 8, 0),
        at(30, 17, 0),
        Duration::minutes(30),
    )
    .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, at(30, 9, 0));
    assert_eq!(slots[0].end, at(30, 16, 0));
}

#[test]
fn fully_booked_day_has_no_slots() {
    let slots = compute(
        &[busy(30, 7, 0, 18, 0)],
        at(30, 8, 0),
        at(30, 17, 0),
        Duration::minutes(1),
    )
    .unwrap();

    assert!(slots.is_empty());
}

#[test]
fn inverted_busy_interval_is_ignored() {
    let slots = compute(
        &[busy(30, 12, 0, 11, 0)],
        at(30, 9, 0),
        at(30, 17, 0),
        Duration::minutes(30),
    )
    .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].duration_minutes, 480);
}

#[test]
fn now_inside_window_trims_past_time() {
    let slots = compute_from(
        &[busy(30, 11, 0, 12, 0)],
        at(30, 9, 0),
        at(30, 17, 0),
        Duration::minutes(30),
        at(30, 10, 45),
    )
    .unwrap();

    // 10:45-11:00 is too short; only the afternoon remains.
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, at(30, 12, 0));
}

#[test]
fn now_after_window_yields_nothing() {
    let slots = compute_from(
        &[],
        at(30, 9, 0),
        at(30, 17, 0),
        Duration::minutes(30),
        at(30, 18, 0),
    )
    .unwrap();

    assert!(slots.is_empty());
}

#[test]
fn empty_window_is_rejected() {
    let err = compute(&[], at(30, 9, 0), at(30, 9, 0), Duration::minutes(30)).unwrap_err();
    assert!(matches!(err, SkillTimeError::InvalidWindow { .. }));

    let err = compute(&[], at(30, 10, 0), at(30, 9, 0), Duration::minutes(30)).unwrap_err();
    assert!(matches!(err, SkillTimeError::InvalidWindow { .. }));
}

#[test]
fn negative_minimum_is_rejected() {
    let err = compute(&[], at(30, 9, 0), at(30, 17, 0), Duration::minutes(-5)).unwrap_err();
    assert!(matches!(err, SkillTimeError::InvalidDuration(_)));
}

#[test]
fn first_free_slot_skips_short_gaps() {
    let slot = find_first_free_slot(
        &[busy(30, 9, 0, 10, 0), busy(30, 10, 15, 11, 0)],
        at(30, 9, 0),
        at(30, 17, 0),
        Duration::minutes(60),
    )
    .unwrap()
    .expect("afternoon is free");

    assert_eq!(slot.start, at(30, 11, 0));
    assert_eq!(slot.end, at(30, 17, 0));
}

#[test]
fn first_free_slot_none_when_booked() {
    let slot = find_first_free_slot(
        &[busy(30, 9, 0, 17, 0)],
        at(30, 9, 0),
        at(30, 17, 0),
        Duration::minutes(15),
    )
    .unwrap();

    assert!(slot.is_none());
}
