use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::models::activity::{Activity, ActivityId, ActivityType};
use crate::models::trip::TripRange;
use crate::services::schedule::conflicts::{warnings_from, ConflictDetector, ConflictMap, ConflictWarning};
use crate::utils::date::serde_date;

use super::{ActivityStore, CachedActivity, EntryKey};

/// One rendered column of the itinerary. Every date of the trip gets one,
/// including empty days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItineraryDay {
    #[serde(with = "serde_date")]
    pub date: NaiveDate,
    pub day_number: u32,
    pub title: String,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub total: usize,
    pub meetings: usize,
    /// Meetings and events.
    pub visits: usize,
    pub confirmed: usize,
    /// Distinct activity dates.
    pub days: usize,
    pub by_type: BTreeMap<ActivityType, usize>,
}

/// Start time as seen on `date`. Times only apply on the governing day.
fn start_on(activity: &Activity, date: NaiveDate) -> Option<NaiveTime> {
    activity.start_time.filter(|_| activity.activity_date == date)
}

/// Timed activities first by start, untimed ones last.
fn by_time(a: Option<NaiveTime>, b: Option<NaiveTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl ActivityStore {
    /// All activities ordered by date, then start time (untimed last).
    pub fn list(&self) -> Vec<&Activity> {
        let mut entries: Vec<&CachedActivity> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            a.activity
                .activity_date
                .cmp(&b.activity.activity_date)
                .then_with(|| by_time(a.activity.start_time, b.activity.start_time))
                .then_with(|| a.activity.title.cmp(&b.activity.title))
                .then_with(|| a.key.cmp(&b.key))
        });
        entries.into_iter().map(|entry| &entry.activity).collect()
    }

    /// Activities bucketed per date. A multi-day activity appears under every
    /// date it spans.
    pub fn group_by_date(&self) -> BTreeMap<NaiveDate, Vec<&Activity>> {
        let mut buckets: BTreeMap<NaiveDate, Vec<&CachedActivity>> = BTreeMap::new();
        for entry in self.entries.values() {
            let activity = &entry.activity;
            let mut date = activity.activity_date;
            while date <= activity.end_date {
                buckets.entry(date).or_default().push(entry);
                match date.succ_opt() {
                    Some(next) => date = next,
                    None => break,
                }
            }
        }

        buckets
            .into_iter()
            .map(|(date, mut entries)| {
                sort_day(&mut entries, date);
                (date, entries.into_iter().map(|entry| &entry.activity).collect())
            })
            .collect()
    }

    /// Activities visible on one date, in display order.
    pub fn activities_on(&self, date: NaiveDate) -> Vec<&Activity> {
        let mut entries: Vec<&CachedActivity> = self
            .entries
            .values()
            .filter(|entry| entry.activity.occurs_on(date))
            .collect();
        sort_day(&mut entries, date);
        entries.into_iter().map(|entry| &entry.activity).collect()
    }

    /// One day bucket per date of `range`, titled "Day N".
    pub fn itinerary(&self, range: &TripRange) -> Vec<ItineraryDay> {
        let mut grouped = self.group_by_date();
        range
            .dates()
            .enumerate()
            .map(|(index, date)| {
                let day_number = index as u32 + 1;
                ItineraryDay {
                    date,
                    day_number,
                    title: format!("Day {day_number}"),
                    activities: grouped
                        .remove(&date)
                        .unwrap_or_default()
                        .into_iter()
                        .cloned()
                        .collect(),
                }
            })
            .collect()
    }

    pub fn stats(&self) -> ActivityStats {
        let mut stats = ActivityStats::default();
        let mut days = BTreeSet::new();

        for entry in self.entries.values() {
            let activity = &entry.activity;
            stats.total += 1;
            if activity.activity_type == ActivityType::Meeting {
                stats.meetings += 1;
            }
            if activity.activity_type.is_visit() {
                stats.visits += 1;
            }
            if activity.is_confirmed {
                stats.confirmed += 1;
            }
            *stats.by_type.entry(activity.activity_type).or_insert(0) += 1;
            days.insert(activity.activity_date);
        }

        stats.days = days.len();
        stats
    }

    /// Overlaps among the activities visible on `date`, keyed by entry.
    pub fn entry_conflicts_on(&self, date: NaiveDate, detector: &ConflictDetector) -> ConflictMap<EntryKey> {
        detector.detect_on(
            date,
            self.entries.values().map(|entry| (entry.key, &entry.activity)),
        )
    }

    /// Overlaps among the persisted activities visible on `date`.
    pub fn conflicts_on(&self, date: NaiveDate, detector: &ConflictDetector) -> ConflictMap<ActivityId> {
        detector.detect_on(
            date,
            self.entries
                .values()
                .filter_map(|entry| entry.activity.id.map(|id| (id, &entry.activity))),
        )
    }

    pub fn conflict_warnings_on(&self, date: NaiveDate, detector: &ConflictDetector) -> Vec<ConflictWarning> {
        let conflicts = self.conflicts_on(date, detector);
        warnings_from(&conflicts, |id| self.get(id))
    }
}

fn sort_day(entries: &mut [&CachedActivity], date: NaiveDate) {
    entries.sort_by(|a, b| {
        by_time(start_on(&a.activity, date), start_on(&b.activity, date))
            .then_with(|| a.activity.title.cmp(&b.activity.title))
            .then_with(|| a.key.cmp(&b.key))
    });
}
