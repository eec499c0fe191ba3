// Property-based tests for the slot grid, conflict detection, day grouping
// and range shifting

use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveTime};
use proptest::prelude::*;
use trip_scheduler::models::activity::{ActivityDraft, ActivityId};
use trip_scheduler::models::trip::{ExtendDirection, TripId, TripRange};
use trip_scheduler::services::schedule::conflicts::TimedEntry;
use trip_scheduler::services::schedule::{generate_slots, ActivityStore, ConflictDetector, TripRangeExtender};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()
}

fn minutes(m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap()
}

fn slot_duration() -> impl Strategy<Value = u32> {
    prop_oneof![Just(15u32), Just(30u32), Just(60u32)]
}

/// (start minute, length in minutes) pairs within one day.
fn timed_entries() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((0u32..1380, 1u32..=180), 0..12)
}

proptest! {
    /// Property: the grid starts at the first hour, ends at or before the
    /// last hour and steps evenly
    #[test]
    fn prop_slots_are_evenly_spaced(
        start_hour in 0u32..=24,
        span in 0u32..=24,
        duration in slot_duration(),
    ) {
        let end_hour = (start_hour + span).min(24);
        let slots = generate_slots(start_hour, end_hour, duration);

        prop_assert_eq!(slots.len() as u32, (end_hour - start_hour) * 60 / duration + 1);
        prop_assert_eq!(slots[0].clone(), format!("{:02}:00", start_hour));

        let parsed: Vec<u32> = slots
            .iter()
            .map(|slot| {
                let (h, m) = slot.split_once(':').unwrap();
                h.parse::<u32>().unwrap() * 60 + m.parse::<u32>().unwrap()
            })
            .collect();
        for pair in parsed.windows(2) {
            prop_assert_eq!(pair[1] - pair[0], duration);
        }
        prop_assert!(*parsed.last().unwrap() <= end_hour * 60);
    }

    /// Property: inverted hours never produce slots
    #[test]
    fn prop_inverted_hours_are_empty(start_hour in 1u32..=24, back in 1u32..=24, duration in slot_duration()) {
        let end_hour = start_hour.saturating_sub(back);
        prop_assume!(end_hour < start_hour);
        prop_assert!(generate_slots(start_hour, end_hour, duration).is_empty());
    }

    /// Property: overlap is symmetric and matches the half-open rule
    #[test]
    fn prop_conflicts_match_pairwise_overlap(raw in timed_entries()) {
        let entries: Vec<TimedEntry<usize>> = raw
            .iter()
            .enumerate()
            .map(|(key, &(start, len))| TimedEntry {
                key,
                start: Some(minutes(start)),
                end: Some(minutes((start + len).min(1439))),
            })
            .collect();
        let conflicts = ConflictDetector::new(30).detect(&entries);

        for (key, others) in &conflicts {
            prop_assert!(!others.contains(key));
            for other in others {
                prop_assert!(conflicts[other].contains(key));
            }
        }

        for (i, &(a_start, a_len)) in raw.iter().enumerate() {
            for (j, &(b_start, b_len)) in raw.iter().enumerate() {
                if i >= j {
                    continue;
                }
                let a_end = (a_start + a_len).min(1439);
                let b_end = (b_start + b_len).min(1439);
                let overlaps = a_start < b_end && b_start < a_end;
                let reported = conflicts.get(&i).map_or(false, |set| set.contains(&j));
                prop_assert_eq!(reported, overlaps, "entries {} and {}", i, j);
            }
        }
    }

    /// Property: back-to-back activities never conflict
    #[test]
    fn prop_adjacent_intervals_do_not_conflict(start in 0u32..1200, first in 1u32..120, second in 1u32..120) {
        let boundary = start + first;
        let entries = [
            TimedEntry { key: 0, start: Some(minutes(start)), end: Some(minutes(boundary)) },
            TimedEntry { key: 1, start: Some(minutes(boundary)), end: Some(minutes(boundary + second)) },
        ];
        prop_assert!(ConflictDetector::default().detect(&entries).is_empty());
    }

    /// Property: grouping places each activity under exactly the dates it
    /// spans, and regrouping gives the same result
    #[test]
    fn prop_grouping_covers_each_spanned_day(spans in prop::collection::vec((0u64..10, 0u64..4), 0..15)) {
        let trip = TripId(1);
        let activities = spans
            .iter()
            .enumerate()
            .map(|(index, &(offset, length))| {
                let start = base_date() + Days::new(offset);
                ActivityDraft::new(format!("Activity {index}"))
                    .on(start)
                    .until(start + Days::new(length))
                    .to_activity(trip, Some(ActivityId(index as i64 + 1)))
                    .unwrap()
            })
            .collect();

        let mut store = ActivityStore::new(trip, Duration::from_secs(2));
        store.replace_all(activities);

        let grouped = store.group_by_date();
        let placements: usize = grouped.values().map(Vec::len).sum();
        let expected: u64 = spans.iter().map(|&(_, length)| length + 1).sum();
        prop_assert_eq!(placements as u64, expected);

        for (date, day) in &grouped {
            prop_assert!(day.iter().all(|activity| activity.occurs_on(*date)));
            prop_assert_eq!(day, &store.activities_on(*date));
        }
        prop_assert_eq!(&grouped, &store.group_by_date());
    }

    /// Property: adding days then removing the same number restores the range
    #[test]
    fn prop_shift_round_trip(offset in 0u64..300, length in 0u64..20, days in 0i64..30, after in any::<bool>()) {
        let start = base_date() + Days::new(offset);
        let range = TripRange::new(start, start + Days::new(length)).unwrap();
        let direction = if after { ExtendDirection::After } else { ExtendDirection::Before };

        let grown = TripRangeExtender::shifted(range, direction, days).unwrap();
        prop_assert_eq!(grown.day_count(), range.day_count() + days);
        prop_assert_eq!(TripRangeExtender::shifted(grown, direction, -days).unwrap(), range);
    }
}
