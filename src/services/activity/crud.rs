use super::queries::{map_activity_row, ACTIVITY_COLUMNS};
use super::shared::time_text;
use super::ActivityService;
use crate::models::activity::{Activity, ActivityDraft, ActivityId, ActivityPatch};
use crate::models::trip::TripId;
use crate::utils::date::format_date;
use anyhow::{anyhow, Context, Result};
use rusqlite::{self, params};

impl<'a> ActivityService<'a> {
    /// Insert a new activity for `trip_id` and return it with its id.
    pub fn create(&self, trip_id: TripId, draft: &ActivityDraft) -> Result<Activity> {
        let mut activity = draft.to_activity(trip_id, None).map_err(|e| anyhow!(e))?;

        self.conn
            .execute(
                "INSERT INTO activities (
                    trip_id, title, description, activity_date, end_date, start_time, end_time,
                    activity_type, is_confirmed, location, host, cost, currency, notes
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    trip_id.0,
                    activity.title,
                    activity.description,
                    format_date(activity.activity_date),
                    format_date(activity.end_date),
                    time_text(activity.start_time),
                    time_text(activity.end_time),
                    activity.activity_type.as_str(),
                    activity.is_confirmed as i32,
                    activity.location,
                    activity.host,
                    activity.cost,
                    activity.currency.map(|currency| currency.code()),
                    activity.notes,
                ],
            )
            .context("Failed to insert activity")?;

        activity.id = Some(ActivityId(self.conn.last_insert_rowid()));
        Ok(activity)
    }

    /// Retrieve an activity by ID.
    pub fn get(&self, id: ActivityId) -> Result<Option<Activity>> {
        let result = self.conn.query_row(
            &format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?"),
            [id.0],
            map_activity_row,
        );

        match result {
            Ok(activity) => Ok(Some(activity)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `patch` to a stored activity and return the stored result.
    pub fn update(&self, id: ActivityId, patch: &ActivityPatch) -> Result<Activity> {
        let current = self
            .get(id)?
            .ok_or_else(|| anyhow!("Activity with id {} not found", id))?;
        let activity = patch.preview(&current).map_err(|e| anyhow!(e))?;

        let rows_affected = self
            .conn
            .execute(
                "UPDATE activities SET
                    title = ?, description = ?, activity_date = ?, end_date = ?,
                    start_time = ?, end_time = ?, activity_type = ?, is_confirmed = ?,
                    location = ?, host = ?, cost = ?, currency = ?, notes = ?,
                    updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?",
                params![
                    activity.title,
                    activity.description,
                    format_date(activity.activity_date),
                    format_date(activity.end_date),
                    time_text(activity.start_time),
                    time_text(activity.end_time),
                    activity.activity_type.as_str(),
                    activity.is_confirmed as i32,
                    activity.location,
                    activity.host,
                    activity.cost,
                    activity.currency.map(|currency| currency.code()),
                    activity.notes,
                    id.0,
                ],
            )
            .context("Failed to update activity")?;

        if rows_affected == 0 {
            return Err(anyhow!("Activity with id {} not found", id));
        }

        Ok(activity)
    }

    /// Delete an activity. Returns `false` if nothing was deleted.
    pub fn delete(&self, id: ActivityId) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM activities WHERE id = ?", [id.0])
            .context("Failed to delete activity")?;

        Ok(rows_affected > 0)
    }
}
