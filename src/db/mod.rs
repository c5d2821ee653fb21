use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use anyhow::{anyhow, Result, Context};

pub mod migrations;
pub mod queries;

#[cfg(test)]
pub mod test_helpers;

pub use migrations::{run_migrations, seed_default_controls, seed_demo, SeedSummary};
pub use queries::*;

/// Get the database file path inside `data_dir`, creating the directory
pub fn get_db_path(data_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir)
        .context(format!("Failed to create data directory: {:?}", data_dir))?;

    Ok(data_dir.join("compliance.db"))
}

/// Open the database at `db_path` and run migrations
pub fn init_db(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
            | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
            | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX, // access is serialized by `Database`
    ).context(format!("Failed to open database at {:?}", db_path))?;

    configure_connection(&conn)?;

    // Run migrations (only runs once, safe to call multiple times)
    run_migrations(&conn)?;

    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    // Enable foreign key support (cascades and RESTRICT depend on it)
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .context("Failed to enable WAL mode")?;

    // Reduce blocking by setting busy timeout
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    Ok(())
}

/// Shared handle to the single SQLite connection
///
/// Callers take the lock for a short, synchronous unit of work and must drop
/// the guard before any `.await`.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (and migrate) the database file at `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::from_connection(init_db(db_path)?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Lock the connection
    ///
    /// # Errors
    /// Returns error if a previous holder panicked while holding the lock
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }
}
