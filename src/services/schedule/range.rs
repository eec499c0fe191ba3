//! Trip date-range changes and the activity reconciliation they imply.
//!
//! [`TripRangeExtender::plan`] is pure: it computes the new range and the
//! full list of deletions and clamps without touching any state. Applying
//! the plan is the caller's job and must happen as one logical commit.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Result, ScheduleError};
use crate::models::activity::{Activity, ActivityId};
use crate::models::trip::{ExtendDirection, TripRange};
use crate::utils::date::add_days;

/// Activity removed because none of its days survive the new range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedActivity<K> {
    pub key: K,
    pub id: Option<ActivityId>,
    pub title: String,
    pub is_confirmed: bool,
}

/// Activity kept but with its dates pulled inside the new range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClampedActivity<K> {
    pub key: K,
    pub id: Option<ActivityId>,
    pub activity_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeChange<K> {
    pub direction: ExtendDirection,
    pub days: i64,
    pub previous: TripRange,
    pub range: TripRange,
    pub deleted: Vec<DeletedActivity<K>>,
    pub clamped: Vec<ClampedActivity<K>>,
}

impl<K> RangeChange<K> {
    pub fn is_noop(&self) -> bool {
        self.previous == self.range
    }

    pub fn is_removal(&self) -> bool {
        self.days < 0
    }

    pub fn touches_activities(&self) -> bool {
        !self.deleted.is_empty() || !self.clamped.is_empty()
    }

    /// Whether applying the change would delete a confirmed activity.
    pub fn deletes_confirmed(&self) -> bool {
        self.deleted.iter().any(|deleted| deleted.is_confirmed)
    }
}

pub struct TripRangeExtender;

impl TripRangeExtender {
    /// Shift one boundary of `range` by `days`.
    ///
    /// `After` moves the end by `+days`; `Before` moves the start by `-days`,
    /// so a positive count always adds days to the trip.
    pub fn shifted(range: TripRange, direction: ExtendDirection, days: i64) -> Result<TripRange> {
        let overflow = || ScheduleError::validation("days", format!("{days} days is out of range"));

        let (new_start, new_end) = match direction {
            ExtendDirection::After => (range.start(), add_days(range.end(), days).ok_or_else(overflow)?),
            ExtendDirection::Before => {
                let back = days.checked_neg().ok_or_else(overflow)?;
                (add_days(range.start(), back).ok_or_else(overflow)?, range.end())
            }
        };

        if new_start > new_end {
            return Err(ScheduleError::InvalidRange {
                direction,
                removed: days.checked_neg().ok_or_else(overflow)?,
                new_start,
                new_end,
            });
        }

        TripRange::new(new_start, new_end)
    }

    /// Compute the new range and the reconciliation effects for `activities`.
    ///
    /// Additions never touch activities. Removals delete activities with no
    /// day left inside the new range and clamp those that straddle a
    /// boundary, keeping their times.
    pub fn plan<'a, K, I>(
        range: TripRange,
        direction: ExtendDirection,
        days: i64,
        activities: I,
    ) -> Result<RangeChange<K>>
    where
        K: Copy,
        I: IntoIterator<Item = (K, &'a Activity)>,
    {
        let new_range = Self::shifted(range, direction, days)?;
        let mut change = RangeChange {
            direction,
            days,
            previous: range,
            range: new_range,
            deleted: Vec::new(),
            clamped: Vec::new(),
        };

        if days >= 0 {
            return Ok(change);
        }

        for (key, activity) in activities {
            if activity.end_date < new_range.start() || activity.activity_date > new_range.end() {
                change.deleted.push(DeletedActivity {
                    key,
                    id: activity.id,
                    title: activity.title.clone(),
                    is_confirmed: activity.is_confirmed,
                });
                continue;
            }

            let activity_date = activity.activity_date.max(new_range.start());
            let end_date = activity.end_date.min(new_range.end());
            if activity_date != activity.activity_date || end_date != activity.end_date {
                change.clamped.push(ClampedActivity {
                    key,
                    id: activity.id,
                    activity_date,
                    end_date,
                });
            }
        }

        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityDraft;
    use crate::models::trip::TripId;
    use crate::utils::date::parse_date;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn d(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    fn range(start: &str, end: &str) -> TripRange {
        TripRange::new(d(start), d(end)).unwrap()
    }

    fn activity(id: i64, start: &str, end: &str) -> Activity {
        ActivityDraft::new(format!("Activity {id}"))
            .on(d(start))
            .until(d(end))
            .to_activity(TripId(1), Some(ActivityId(id)))
            .unwrap()
    }

    #[test_case(ExtendDirection::After, 1, "2024-07-27", "2024-07-31"; "add after")]
    #[test_case(ExtendDirection::After, -1, "2024-07-27", "2024-07-29"; "remove after")]
    #[test_case(ExtendDirection::Before, 1, "2024-07-26", "2024-07-30"; "add before")]
    #[test_case(ExtendDirection::Before, -1, "2024-07-28", "2024-07-30"; "remove before")]
    #[test_case(ExtendDirection::After, 0, "2024-07-27", "2024-07-30"; "zero is a no-op")]
    fn test_shifted_boundaries(direction: ExtendDirection, days: i64, start: &str, end: &str) {
        let shifted = TripRangeExtender::shifted(range("2024-07-27", "2024-07-30"), direction, days).unwrap();
        assert_eq!(shifted, range(start, end));
    }

    #[test_case(ExtendDirection::After, i64::MAX; "max after")]
    #[test_case(ExtendDirection::After, i64::MIN; "min after")]
    #[test_case(ExtendDirection::After, i64::MAX / 2; "half max after")]
    #[test_case(ExtendDirection::Before, i64::MAX; "max before")]
    #[test_case(ExtendDirection::Before, i64::MIN; "min before")]
    #[test_case(ExtendDirection::Before, i64::MAX / 2; "half max before")]
    fn test_huge_day_counts_are_rejected(direction: ExtendDirection, days: i64) {
        let err = TripRangeExtender::shifted(range("2024-07-27", "2024-07-30"), direction, days).unwrap_err();
        assert!(matches!(err, ScheduleError::Validation { field: "days", .. }));
    }

    #[test]
    fn test_large_removal_reports_invalid_range() {
        let err = TripRangeExtender::shifted(range("2024-07-27", "2024-07-30"), ExtendDirection::After, -1_000_000)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRange { removed: 1_000_000, .. }));
    }

    #[test]
    fn test_cannot_remove_more_days_than_the_trip_spans() {
        let err = TripRangeExtender::shifted(range("2024-07-28", "2024-07-29"), ExtendDirection::Before, -3)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRange { removed: 3, .. }));
    }

    #[test]
    fn test_removing_all_but_one_day_is_allowed() {
        let shifted =
            TripRangeExtender::shifted(range("2024-07-28", "2024-07-29"), ExtendDirection::After, -1).unwrap();
        assert_eq!(shifted.day_count(), 1);
    }

    #[test]
    fn test_addition_touches_nothing() {
        let outside = activity(1, "2024-08-10", "2024-08-10");
        let change = TripRangeExtender::plan(
            range("2024-07-27", "2024-07-30"),
            ExtendDirection::After,
            2,
            [(1u32, &outside)],
        )
        .unwrap();

        assert!(!change.touches_activities());
        assert_eq!(change.range.end(), d("2024-08-01"));
    }

    #[test]
    fn test_removal_clamps_straddling_activity() {
        let spanning = activity(1, "2024-07-28", "2024-07-30");
        let change = TripRangeExtender::plan(
            range("2024-07-27", "2024-07-30"),
            ExtendDirection::After,
            -1,
            [(1u32, &spanning)],
        )
        .unwrap();

        assert!(change.deleted.is_empty());
        assert_eq!(
            change.clamped,
            vec![ClampedActivity {
                key: 1,
                id: Some(ActivityId(1)),
                activity_date: d("2024-07-28"),
                end_date: d("2024-07-29"),
            }]
        );
    }

    #[test]
    fn test_removal_deletes_activities_fully_outside() {
        let dropped = activity(1, "2024-07-27", "2024-07-27");
        let mut confirmed = activity(2, "2024-07-27", "2024-07-28");
        confirmed.is_confirmed = true;
        let kept = activity(3, "2024-07-29", "2024-07-29");

        let change = TripRangeExtender::plan(
            range("2024-07-27", "2024-07-30"),
            ExtendDirection::Before,
            -1,
            [(1u32, &dropped), (2u32, &confirmed), (3u32, &kept)],
        )
        .unwrap();

        assert_eq!(change.deleted.len(), 1);
        assert_eq!(change.deleted[0].id, Some(ActivityId(1)));
        assert!(!change.deletes_confirmed());
        assert_eq!(change.clamped.len(), 1);
        assert_eq!(change.clamped[0].activity_date, d("2024-07-28"));
        assert_eq!(change.clamped[0].end_date, d("2024-07-28"));
    }

    #[test]
    fn test_deletes_confirmed_is_reported() {
        let mut confirmed = activity(1, "2024-07-30", "2024-07-30");
        confirmed.is_confirmed = true;
        let change = TripRangeExtender::plan(
            range("2024-07-27", "2024-07-30"),
            ExtendDirection::After,
            -1,
            [(1u32, &confirmed)],
        )
        .unwrap();
        assert!(change.deletes_confirmed());
    }
}
