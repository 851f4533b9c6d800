//! Database schema definitions
//!
//! This module contains the SQL schema for the crawl frontier and its
//! associated tables.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- URLs discovered during the crawl and their processing state
CREATE TABLE IF NOT EXISTS frontier (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'pending',
    added_at TEXT NOT NULL,
    last_try TEXT,
    depth INTEGER NOT NULL DEFAULT 0,
    retries INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_frontier_status ON frontier(status);
CREATE INDEX IF NOT EXISTS idx_frontier_added_at ON frontier(added_at);

-- Record of every URL that reached a terminal fetch outcome
CREATE TABLE IF NOT EXISTS visited (
    url TEXT PRIMARY KEY,
    fetched_at TEXT NOT NULL,
    status_code INTEGER
);

-- Content-addressed page bodies, deduplicated by hash
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    content_path TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    title TEXT,
    meta_description TEXT,
    status_code INTEGER,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_content_hash ON pages(content_hash);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
