use anyhow::{Context, Result};
use rusqlite::Connection;

use super::schema;

const IN_MEMORY: &str = ":memory:";

/// Owns the SQLite connection holding trips and their activities.
pub struct Database {
    conn: Connection,
    path: String,
}

impl Database {
    /// Open or create the file at `path` with foreign keys enforced, so
    /// deleting a trip cascades to its activities.
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open trip database at {}", path))?;

        conn.pragma_update(None, "foreign_keys", true)
            .context("Failed to enable foreign keys")?;

        log::debug!("Opened trip database {}", path);
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(IN_MEMORY)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the trip and activity tables, then apply column migrations.
    pub fn initialize_schema(&self) -> Result<()> {
        schema::initialize_schema(self.connection())
    }
}
