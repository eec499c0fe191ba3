// Test fixtures - reusable test data
// Dates and activities around one week-long business trip

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use trip_scheduler::models::activity::{Activity, ActivityDraft, ActivityId, ActivityType};
use trip_scheduler::models::trip::{Trip, TripId, TripRange};
use trip_scheduler::services::repository::SqliteRepository;

/// Sample dates for testing
pub mod dates {
    use super::*;

    pub fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    pub fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// 2025-07-28 through 2025-07-31
    pub fn trip_range() -> TripRange {
        TripRange::new(day(28), day(31)).unwrap()
    }
}

/// Sample activities for testing
pub mod activities {
    use super::*;

    pub fn meeting(title: &str, date: NaiveDate, start: (u32, u32), end: (u32, u32)) -> ActivityDraft {
        ActivityDraft::new(title)
            .on(date)
            .at(dates::time(start.0, start.1), Some(dates::time(end.0, end.1)))
            .kind(ActivityType::Meeting)
    }

    pub fn all_day(title: &str, date: NaiveDate) -> ActivityDraft {
        ActivityDraft::new(title).on(date).kind(ActivityType::Other)
    }

    /// An already-persisted activity, for store-level tests that skip SQLite.
    pub fn persisted(id: i64, trip: TripId, draft: &ActivityDraft) -> Activity {
        draft.to_activity(trip, Some(ActivityId(id))).unwrap()
    }
}

/// A fresh database in a temp dir with one trip over [`dates::trip_range`].
pub fn seeded_repository(dir: &tempfile::TempDir) -> (SqliteRepository, Trip) {
    let path = dir.path().join("trips.db");
    let repo = SqliteRepository::open(path.to_str().unwrap()).unwrap();
    let trip = repo
        .create_trip(&Trip::new("Hamburg customer week", dates::trip_range()).unwrap())
        .unwrap();
    (repo, trip)
}
