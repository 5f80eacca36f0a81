use crate::merge::PairLocks;
use rusqlite::{Connection, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// SQLite-backed record store. One connection, serialized behind a mutex so
/// the store can be shared across merge workers.
pub struct Database {
    conn: Mutex<Connection>,
    pub(super) locks: PairLocks,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database {
            conn: Mutex::new(conn),
            locks: PairLocks::new(),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Mutex::new(conn),
            locks: PairLocks::new(),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.connection().execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -16000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, foreign keys on)");
        Ok(())
    }

    /// Create tables on first open. Older layouts are not migrated in place.
    fn migrate_schema(&self) -> Result<()> {
        let conn = self.connection();
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version > SCHEMA_VERSION {
            debug!("Schema version {} is newer than {}, leaving it alone", version, SCHEMA_VERSION);
            return Ok(());
        }

        conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// The underlying connection. A poisoned lock is recovered: every
    /// statement is atomic on its own, so no half-written state is visible.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.connection().execute_batch(
            "DELETE FROM label_reference;
             DELETE FROM label;
             DELETE FROM managed_file;",
        )?;
        debug!("All tables truncated");
        Ok(())
    }
}
