//! Same-day time-overlap detection.
//!
//! Intervals are half-open: `[09:00, 10:00)` and `[10:00, 11:00)` are
//! back-to-back, not overlapping. Activity types are not considered; two
//! simultaneous travel legs are flagged like any other pair.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::models::activity::{Activity, ActivityId};
use crate::utils::date::{format_time, minutes_of_day};

/// Symmetric overlap relation: every key maps to the keys it overlaps.
pub type ConflictMap<K> = BTreeMap<K, BTreeSet<K>>;

/// One participant in conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEntry<K> {
    pub key: K,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

#[derive(Debug, Clone, Copy)]
struct Interval<K> {
    key: K,
    start: u32,
    end: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictDetector {
    slot_minutes: u32,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(30)
    }
}

impl ConflictDetector {
    /// `slot_minutes` is the grid granularity used as the length of an
    /// activity that has a start but no usable end.
    pub fn new(slot_minutes: u32) -> Self {
        Self {
            slot_minutes: slot_minutes.max(1),
        }
    }

    pub fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    /// Sort-and-sweep over the normalized intervals, O(n log n) plus the
    /// number of reported edges.
    pub fn detect<K: Ord + Copy>(&self, entries: &[TimedEntry<K>]) -> ConflictMap<K> {
        let mut intervals: Vec<Interval<K>> = entries
            .iter()
            .filter_map(|entry| self.normalize(entry))
            .collect();
        intervals.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));

        let mut conflicts: ConflictMap<K> = BTreeMap::new();
        let mut open: Vec<Interval<K>> = Vec::new();

        for current in intervals {
            open.retain(|active| active.end > current.start);
            for active in &open {
                if active.key == current.key {
                    continue;
                }
                conflicts.entry(active.key).or_default().insert(current.key);
                conflicts.entry(current.key).or_default().insert(active.key);
            }
            open.push(current);
        }

        conflicts
    }

    /// Detect overlaps among the activities visible on `date`.
    ///
    /// Times belong to an activity's first day, so a multi-day activity only
    /// takes part on its `activity_date`; on later days it is all-day.
    pub fn detect_on<'a, K, I>(&self, date: NaiveDate, activities: I) -> ConflictMap<K>
    where
        K: Ord + Copy,
        I: IntoIterator<Item = (K, &'a Activity)>,
    {
        let entries: Vec<TimedEntry<K>> = activities
            .into_iter()
            .filter(|(_, activity)| activity.occurs_on(date))
            .map(|(key, activity)| {
                let governs = activity.activity_date == date;
                TimedEntry {
                    key,
                    start: activity.start_time.filter(|_| governs),
                    end: activity.end_time.filter(|_| governs),
                }
            })
            .collect();

        self.detect(&entries)
    }

    fn normalize<K: Copy>(&self, entry: &TimedEntry<K>) -> Option<Interval<K>> {
        let (start, end) = match (entry.start, entry.end) {
            (None, None) => return None,
            (Some(start), Some(end)) if end > start => (minutes_of_day(start), minutes_of_day(end)),
            (Some(start), _) => {
                let start = minutes_of_day(start);
                (start, start + self.slot_minutes)
            }
            (None, Some(end)) => {
                let end = minutes_of_day(end);
                (end.saturating_sub(self.slot_minutes), end)
            }
        };

        (end > start).then_some(Interval {
            key: entry.key,
            start,
            end,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    TimeOverlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

/// Advisory annotation for an activity that overlaps another one.
/// Never blocks an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictWarning {
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub activity_id: ActivityId,
    pub conflicting_activity_id: ActivityId,
    pub description: String,
    pub suggested_resolution: String,
}

impl ConflictWarning {
    pub fn time_overlap(activity_id: ActivityId, other: &Activity) -> Option<Self> {
        let conflicting_activity_id = other.id?;
        let description = match other.start_time {
            Some(start) => format!("Overlaps with \"{}\" ({})", other.title, format_time(start)),
            None => format!("Overlaps with \"{}\"", other.title),
        };

        Some(Self {
            kind: ConflictKind::TimeOverlap,
            severity: ConflictSeverity::High,
            activity_id,
            conflicting_activity_id,
            description,
            suggested_resolution: "Adjust time or duration".to_string(),
        })
    }
}

/// Expand a conflict map keyed by activity id into warning records.
pub fn warnings_from<'a>(
    conflicts: &ConflictMap<ActivityId>,
    lookup: impl Fn(ActivityId) -> Option<&'a Activity>,
) -> Vec<ConflictWarning> {
    conflicts
        .iter()
        .flat_map(|(id, others)| {
            others
                .iter()
                .filter_map(|other| lookup(*other))
                .filter_map(|other| ConflictWarning::time_overlap(*id, other))
                .collect::<Vec<_>>()
        })
        .collect()
}
