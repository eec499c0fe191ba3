//! Trip persistence: identity, name and the authoritative date range.

use anyhow::{anyhow, Context, Result};
use rusqlite::{self, params, Connection, Row};

use crate::models::trip::{Trip, TripId, TripRange};
use crate::utils::date::{format_date, parse_date};

pub struct TripService<'a> {
    conn: &'a Connection,
}

impl<'a> TripService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, trip: &Trip) -> Result<Trip> {
        self.conn
            .execute(
                "INSERT INTO trips (name, start_date, end_date) VALUES (?, ?, ?)",
                params![
                    trip.name,
                    format_date(trip.range.start()),
                    format_date(trip.range.end()),
                ],
            )
            .context("Failed to insert trip")?;

        let mut created = trip.clone();
        created.id = Some(TripId(self.conn.last_insert_rowid()));
        Ok(created)
    }

    pub fn get(&self, id: TripId) -> Result<Option<Trip>> {
        let result = self.conn.query_row(
            "SELECT id, name, start_date, end_date FROM trips WHERE id = ?",
            [id.0],
            map_trip_row,
        );

        match result {
            Ok(trip) => Ok(Some(trip)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(&self) -> Result<Vec<Trip>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, start_date, end_date FROM trips ORDER BY start_date ASC, id ASC")?;

        let trips = stmt
            .query_map([], map_trip_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list trips")?;

        Ok(trips)
    }

    /// Store a new date range for the trip and return what was stored.
    pub fn update_range(&self, id: TripId, range: TripRange) -> Result<TripRange> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE trips SET start_date = ?, end_date = ?, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?",
                params![format_date(range.start()), format_date(range.end()), id.0],
            )
            .context("Failed to update trip dates")?;

        if rows_affected == 0 {
            return Err(anyhow!("Trip with id {} not found", id));
        }

        Ok(range)
    }

    /// Delete a trip and, through the foreign key, all of its activities.
    pub fn delete(&self, id: TripId) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM trips WHERE id = ?", [id.0])
            .context("Failed to delete trip")?;

        Ok(rows_affected > 0)
    }
}

fn map_trip_row(row: &Row<'_>) -> Result<Trip, rusqlite::Error> {
    let start: String = row.get(2)?;
    let end: String = row.get(3)?;
    let invalid = |message: String| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, message.into())
    };

    let start = parse_date(&start).ok_or_else(|| invalid(format!("invalid start date '{start}'")))?;
    let end = parse_date(&end).ok_or_else(|| invalid(format!("invalid end date '{end}'")))?;
    let range = TripRange::new(start, end).map_err(|e| invalid(e.to_string()))?;

    Ok(Trip {
        id: Some(TripId(row.get(0)?)),
        name: row.get(1)?,
        range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::Database;

    fn setup_test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();
        db
    }

    fn range(start: &str, end: &str) -> TripRange {
        TripRange::new(parse_date(start).unwrap(), parse_date(end).unwrap()).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let db = setup_test_db();
        let service = TripService::new(db.connection());

        let trip = Trip::new("Brazil harvest", range("2024-07-27", "2024-07-30")).unwrap();
        let created = service.create(&trip).unwrap();
        let fetched = service.get(created.id.unwrap()).unwrap().unwrap();

        assert_eq!(fetched, created);
    }

    #[test]
    fn test_update_range() {
        let db = setup_test_db();
        let service = TripService::new(db.connection());
        let id = service
            .create(&Trip::new("Colombia", range("2024-09-01", "2024-09-05")).unwrap())
            .unwrap()
            .id
            .unwrap();

        let updated = service.update_range(id, range("2024-09-01", "2024-09-06")).unwrap();
        assert_eq!(service.get(id).unwrap().unwrap().range, updated);
    }

    #[test]
    fn test_update_range_of_missing_trip_fails() {
        let db = setup_test_db();
        let service = TripService::new(db.connection());
        assert!(service
            .update_range(TripId(7), range("2024-09-01", "2024-09-02"))
            .is_err());
    }

    #[test]
    fn test_list_orders_by_start() {
        let db = setup_test_db();
        let service = TripService::new(db.connection());
        service
            .create(&Trip::new("Later", range("2024-10-01", "2024-10-02")).unwrap())
            .unwrap();
        service
            .create(&Trip::new("Sooner", range("2024-08-01", "2024-08-02")).unwrap())
            .unwrap();

        let names: Vec<String> = service.list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Sooner", "Later"]);
    }
}
