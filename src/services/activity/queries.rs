use super::shared::{to_currency, to_date, to_time};
use super::ActivityService;
use crate::models::activity::{Activity, ActivityId, ActivityType};
use crate::models::trip::TripId;
use anyhow::{Context, Result};
use rusqlite::{self, Row};

pub(crate) const ACTIVITY_COLUMNS: &str = "id, trip_id, title, description, activity_date, end_date,
    start_time, end_time, activity_type, is_confirmed, location, host, cost, currency, notes";

impl<'a> ActivityService<'a> {
    /// Every activity of a trip ordered by date, then start time with
    /// untimed activities last.
    pub fn list_for_trip(&self, trip_id: TripId) -> Result<Vec<Activity>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACTIVITY_COLUMNS}
             FROM activities
             WHERE trip_id = ?
             ORDER BY activity_date ASC, start_time IS NULL, start_time ASC, id ASC"
        ))?;

        let activities = stmt
            .query_map([trip_id.0], map_activity_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to list activities of trip {}", trip_id))?;

        Ok(activities)
    }
}

pub(crate) fn map_activity_row(row: &Row<'_>) -> Result<Activity, rusqlite::Error> {
    Ok(Activity {
        id: Some(ActivityId(row.get(0)?)),
        trip_id: TripId(row.get(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        activity_date: to_date(4, row.get(4)?)?,
        end_date: to_date(5, row.get(5)?)?,
        start_time: to_time(6, row.get(6)?)?,
        end_time: to_time(7, row.get(7)?)?,
        activity_type: ActivityType::from_name(&row.get::<_, String>(8)?),
        is_confirmed: row.get::<_, i32>(9)? != 0,
        location: row.get(10)?,
        host: row.get(11)?,
        cost: row.get(12)?,
        currency: to_currency(row.get(13)?),
        notes: row.get(14)?,
    })
}
