use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_trips_table(conn)?;
    create_activities_table(conn)?;
    create_indexes(conn)?;
    Ok(())
}

fn create_trips_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS trips (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (start_date <= end_date)
        )",
        [],
    )
    .context("Failed to create trips table")?;

    Ok(())
}

fn create_activities_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS activities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            trip_id INTEGER NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            activity_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            start_time TEXT,
            end_time TEXT,
            activity_type TEXT NOT NULL DEFAULT 'other',
            is_confirmed INTEGER NOT NULL DEFAULT 0,
            location TEXT,
            host TEXT,
            cost REAL,
            currency TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (activity_date <= end_date)
        )",
        [],
    )
    .context("Failed to create activities table")?;

    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_activities_trip_date
         ON activities(trip_id, activity_date)",
        [],
    )
    .context("Failed to create activities index")?;

    Ok(())
}
