//! SQLite implementation of the frontier/visited/pages store.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{FrontierEntry, Store, StoreError, StoreResult, StoreStats};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite-backed [`Store`]. Each worker holds its own connection for its
/// full lifetime; SQLite's own locking (via `BEGIN IMMEDIATE`) arbitrates
/// concurrent claims rather than an in-process mutex.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if necessary) the database at `path`.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing).
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Direct connection access for tests that need to break the schema
    /// to exercise a store-layer failure path.
    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn configure(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
            PRAGMA busy_timeout = 5000;
        ",
        )
    }
}

impl Store for SqliteStore {
    fn insert_if_new(&self, url: &str, depth: u32) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO frontier (url, status, added_at, depth) VALUES (?1, 'pending', ?2, ?3)",
            params![url, now, depth],
        )?;
        Ok(())
    }

    fn claim_next(&self, stuck_threshold_secs: i64) -> StoreResult<Option<FrontierEntry>> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let stuck_cutoff = (now - chrono::Duration::seconds(stuck_threshold_secs)).to_rfc3339();

        // Entries left in_progress past the stuck threshold (e.g. from a
        // worker that crashed mid-fetch) are reclaimed as pending so they
        // can be picked back up.
        self.conn.execute(
            "UPDATE frontier SET status = 'pending'
             WHERE status = 'in_progress' AND last_try < ?1",
            params![stuck_cutoff],
        )?;

        if let Err(e) = self.conn.execute_batch("BEGIN IMMEDIATE") {
            return if is_busy(&e) { Ok(None) } else { Err(e.into()) };
        }

        let claimed = (|| -> Result<Option<FrontierEntry>, rusqlite::Error> {
            let row: Option<(i64, String, u32, u32)> = self
                .conn
                .query_row(
                    "SELECT id, url, depth, retries FROM frontier
                     WHERE status = 'pending' ORDER BY added_at ASC, id ASC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?;

            let Some((id, url, depth, retries)) = row else {
                return Ok(None);
            };

            let updated = self.conn.execute(
                "UPDATE frontier SET status = 'in_progress', last_try = ?1, retries = retries + 1
                 WHERE id = ?2 AND status = 'pending'",
                params![now_str, id],
            )?;

            if updated == 0 {
                return Ok(None);
            }

            Ok(Some(FrontierEntry {
                id,
                url,
                depth,
                retries: retries + 1,
            }))
        })();

        match claimed {
            Ok(entry) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(entry)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                if is_busy(&e) {
                    Ok(None)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    fn mark_done(&self, id: i64, url: &str, status_code: Option<u16>) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE frontier SET status = 'done' WHERE id = ?1",
            params![id],
        )?;
        self.conn.execute(
            "INSERT OR REPLACE INTO visited (url, fetched_at, status_code) VALUES (?1, ?2, ?3)",
            params![url, now, status_code],
        )?;
        Ok(())
    }

    fn mark_failed(&self, id: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE frontier SET status = 'failed' WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    fn requeue(&self, id: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE frontier SET status = 'pending' WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    fn get_page_by_hash(&self, hash: &str) -> StoreResult<Option<String>> {
        let path = self
            .conn
            .query_row(
                "SELECT content_path FROM pages WHERE content_hash = ?1 LIMIT 1",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path)
    }

    fn save_page_metadata(
        &self,
        url: &str,
        content_path: &str,
        content_hash: &str,
        title: Option<&str>,
        meta_description: Option<&str>,
        status_code: Option<u16>,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO pages
             (url, content_path, content_hash, title, meta_description, status_code, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![url, content_path, content_hash, title, meta_description, status_code, now],
        )?;
        Ok(())
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        let mut count_by = |status: &str| -> Result<u64, rusqlite::Error> {
            let count: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM frontier WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        };

        Ok(StoreStats {
            pending: count_by("pending")?,
            in_progress: count_by("in_progress")?,
            done: count_by("done")?,
            failed: count_by("failed")?,
        })
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy
    )
}
