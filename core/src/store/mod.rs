//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The pipeline and the runner call store methods and never execute
//! SQL directly. Scoring and simulation never touch the store at all.

mod city;
mod ingest_run;
mod tract;

pub use ingest_run::IngestRunRecord;

use crate::error::ScoreResult;
use rusqlite::Connection;

pub struct ScoreStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl ScoreStore {
    pub fn open(path: &str) -> ScoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only matters for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests and dry runs).
    pub fn in_memory() -> ScoreResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// File path backing this store, or None when in memory.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order. Idempotent.
    pub fn migrate(&self) -> ScoreResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_tracts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_city_stats.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_ingest_run.sql"))?;
        Ok(())
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
