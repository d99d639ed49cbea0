//! Property tests for time resolution and free-slot computation.

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use proptest::prelude::*;
use skilltime::freeslot::{compute, compute_from, BusyInterval};
use skilltime::parse::parse;
use skilltime::zone::{TimePoint, TimeZoneRef};

fn base() -> TimePoint {
    FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 30, 8, 0, 0)
        .unwrap()
}

fn zone() -> TimeZoneRef {
    TimeZoneRef::named("America/New_York").unwrap()
}

fn busy_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
    // (start minute within the window, length in minutes)
    prop::collection::vec((0i64..600, 1i64..180), 0..20)
}

fn to_busy(raw: &[(i64, i64)]) -> Vec<BusyInterval> {
    raw.iter()
        .map(|&(start, len)| {
            BusyInterval::new(
                base() + Duration::minutes(start),
                base() + Duration::minutes(start + len),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn rfc3339_with_offset_resolves_to_same_instant(
        minutes in 0i64..2_000_000,
        offset_hours in -11i32..=12,
    ) {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let instant = (base() + Duration::minutes(minutes)).with_timezone(&offset);
        let resolved = parse(&instant.to_rfc3339(), &base(), &zone()).unwrap();
        prop_assert_eq!(resolved, instant);
        prop_assert_eq!(resolved.offset(), instant.offset());
    }

    #[test]
    fn today_is_start_of_local_day(
        minutes in 0i64..525_600,
        name in prop::sample::select(vec![
            "America/New_York",
            "America/Santiago",
            "America/Havana",
            "Asia/Beirut",
            "Australia/Lord_Howe",
        ]),
    ) {
        let now = base() + Duration::minutes(minutes);
        let zone = TimeZoneRef::named(name).unwrap();
        let today = parse("today", &now, &zone).unwrap();
        prop_assert!(today <= now);
        prop_assert!(now - today < Duration::hours(25));
        prop_assert_eq!(zone.local_date(&today), zone.local_date(&now));
        // Nothing earlier belongs to the same local day.
        prop_assert!(zone.local_date(&(today - Duration::minutes(1))) < zone.local_date(&now));
    }

    #[test]
    fn bare_time_stays_on_local_date(minutes in 0i64..525_600, hour in 0u32..24) {
        let now = base() + Duration::minutes(minutes);
        let zone = zone();
        // 02:xx is skipped on the spring-forward day.
        let hour = if hour == 2 { 4 } else { hour };
        let resolved = parse(&format!("{hour:02}:15"), &now, &zone).unwrap();
        prop_assert_eq!(zone.local_date(&resolved), zone.local_date(&now));
    }

    #[test]
    fn slots_are_ordered_disjoint_and_long_enough(
        raw in busy_strategy(),
        min in 0i64..120,
    ) {
        let busy = to_busy(&raw);
        let window_end = base() + Duration::minutes(600);
        let slots = compute(&busy, base(), window_end, Duration::minutes(min)).unwrap();

        for slot in &slots {
            prop_assert!(slot.start >= base());
            prop_assert!(slot.end <= window_end);
            prop_assert!(slot.end - slot.start >= Duration::minutes(min));
            prop_assert!(slot.start < slot.end);
            prop_assert_eq!(slot.duration_minutes, (slot.end - slot.start).num_minutes());
            for b in &busy {
                prop_assert!(slot.end <= b.start || slot.start >= b.end,
                    "slot {:?} overlaps busy {:?}", slot, b);
            }
        }
        for pair in slots.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn zero_minimum_covers_everything_not_busy(raw in busy_strategy()) {
        let busy = to_busy(&raw);
        let window_end = base() + Duration::minutes(600);
        let slots = compute(&busy, base(), window_end, Duration::zero()).unwrap();

        // Every minute of the window is either busy or inside a free slot.
        for minute in 0..600 {
            let point = base() + Duration::minutes(minute);
            let next = point + Duration::minutes(1);
            let busy_here = busy.iter().any(|b| b.start < next && b.end > point);
            let free_here = slots.iter().any(|s| s.start <= point && s.end >= next);
            prop_assert!(busy_here != free_here, "minute {} busy={} free={}", minute, busy_here, free_here);
        }
    }

    #[test]
    fn slots_busy_and_short_gaps_partition_the_searched_range(
        raw in busy_strategy(),
        min in 1i64..120,
        now_minute in 0i64..600,
    ) {
        let busy = to_busy(&raw);
        let window_end = base() + Duration::minutes(600);
        let now = base() + Duration::minutes(now_minute);
        let slots =
            compute_from(&busy, base(), window_end, Duration::minutes(min), now).unwrap();

        let busy_at = |minute: i64| {
            let point = base() + Duration::minutes(minute);
            let next = point + Duration::minutes(1);
            busy.iter().any(|b| b.start < next && b.end > point)
        };

        // Every minute of [now, window_end) is exactly one of: busy, inside a
        // slot, or inside a maximal free run shorter than the minimum.
        for minute in now_minute..600 {
            let point = base() + Duration::minutes(minute);
            let next = point + Duration::minutes(1);
            let busy_here = busy_at(minute);
            let in_slot = slots.iter().any(|s| s.start <= point && s.end >= next);
            let in_short_gap = !busy_here && {
                let mut left = minute;
                while left > now_minute && !busy_at(left - 1) {
                    left -= 1;
                }
                let mut right = minute + 1;
                while right < 600 && !busy_at(right) {
                    right += 1;
                }
                right - left < min
            };
            let kinds = [busy_here, in_slot, in_short_gap].iter().filter(|k| **k).count();
            prop_assert_eq!(kinds, 1,
                "minute {} busy={} slot={} short={}", minute, busy_here, in_slot, in_short_gap);
        }
        prop_assert!(slots.iter().all(|s| s.start >= now));
    }

    #[test]
    fn slots_never_start_before_now(raw in busy_strategy(), now_minute in 0i64..700) {
        let busy = to_busy(&raw);
        let now = base() + Duration::minutes(now_minute);
        let window_end = base() + Duration::minutes(600);
        let slots =
            compute_from(&busy, base(), window_end, Duration::minutes(15), now).unwrap();
        prop_assert!(slots.iter().all(|s| s.start >= now));
        if now >= window_end {
            prop_assert!(slots.is_empty());
        }
    }
}

#[test]
fn slots_keep_window_start_offset() {
    let utc_busy = BusyInterval::new(
        DateTime::parse_from_rfc3339("2024-01-30T15:00:00Z").unwrap(),
        DateTime::parse_from_rfc3339("2024-01-30T16:00:00Z").unwrap(),
    );
    let slots = compute(
        &[utc_busy],
        base(),
        base() + Duration::hours(4),
        Duration::minutes(30),
    )
    .unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].end.to_rfc3339(), "2024-01-30T10:00:00-05:00");
    assert_eq!(slots[1].start.to_rfc3339(), "2024-01-30T11:00:00-05:00");
}
