//! The persistence collaborator seen by the scheduling core.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::models::activity::{Activity, ActivityDraft, ActivityId, ActivityPatch};
use crate::models::trip::{Trip, TripId, TripRange};
use crate::services::activity::ActivityService;
use crate::services::database::Database;
use crate::services::trip::TripService;

/// Storage operations the orchestrator depends on. Calls block until the
/// store answers; failures are reported, never retried.
#[cfg_attr(test, mockall::automock)]
pub trait ActivityRepository {
    fn list_activities(&self, trip_id: TripId) -> Result<Vec<Activity>>;

    /// Persist a new activity; the returned copy carries its id.
    fn create_activity(&self, trip_id: TripId, draft: &ActivityDraft) -> Result<Activity>;

    fn update_activity(&self, id: ActivityId, patch: &ActivityPatch) -> Result<Activity>;

    /// `Ok(false)` when nothing was deleted.
    fn delete_activity(&self, id: ActivityId) -> Result<bool>;

    fn update_trip_range(&self, trip_id: TripId, start: NaiveDate, end: NaiveDate) -> Result<TripRange>;
}

/// [`ActivityRepository`] over the bundled SQLite database.
pub struct SqliteRepository {
    db: Database,
}

impl SqliteRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the database at `path` and make sure the schema is current.
    pub fn open(path: &str) -> Result<Self> {
        let db = Database::new(path)?;
        db.initialize_schema()?;
        log::info!("Trip database ready at {}", db.path());
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn trips(&self) -> TripService<'_> {
        TripService::new(self.db.connection())
    }

    pub fn activities(&self) -> ActivityService<'_> {
        ActivityService::new(self.db.connection())
    }

    pub fn create_trip(&self, trip: &Trip) -> Result<Trip> {
        self.trips().create(trip)
    }

    pub fn trip(&self, id: TripId) -> Result<Trip> {
        self.trips()
            .get(id)?
            .ok_or_else(|| anyhow!("Trip with id {} not found", id))
    }
}

impl ActivityRepository for SqliteRepository {
    fn list_activities(&self, trip_id: TripId) -> Result<Vec<Activity>> {
        self.activities().list_for_trip(trip_id)
    }

    fn create_activity(&self, trip_id: TripId, draft: &ActivityDraft) -> Result<Activity> {
        self.activities().create(trip_id, draft)
    }

    fn update_activity(&self, id: ActivityId, patch: &ActivityPatch) -> Result<Activity> {
        self.activities().update(id, patch)
    }

    fn delete_activity(&self, id: ActivityId) -> Result<bool> {
        self.activities().delete(id)
    }

    fn update_trip_range(&self, trip_id: TripId, start: NaiveDate, end: NaiveDate) -> Result<TripRange> {
        let range = TripRange::new(start, end).map_err(|e| anyhow!(e))?;
        self.trips().update_range(trip_id, range)
    }
}
