//! Storage trait and associated types
//!
//! Defines the frontier/visited/pages interface the crawler runs against.
//! There is one implementation ([`crate::storage::SqliteStore`]); the trait
//! exists to keep the worker and controller decoupled from SQLite specifics.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A URL claimed from the frontier, ready to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub id: i64,
    pub url: String,
    pub depth: u32,
    pub retries: u32,
}

/// Snapshot of frontier status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub pending: u64,
    pub in_progress: u64,
    pub done: u64,
    pub failed: u64,
}

/// Frontier and page-store operations needed by workers and the controller.
pub trait Store: Send + Sync {
    /// Inserts `url` into the frontier as pending if it isn't already
    /// present. Uniqueness is enforced by the `url` column, so repeated
    /// discovery of the same URL is a no-op.
    fn insert_if_new(&self, url: &str, depth: u32) -> StoreResult<()>;

    /// Atomically claims the oldest pending URL (or a stuck in-progress
    /// one) and marks it in-progress. Returns `None` if nothing is
    /// claimable right now, including when the database is momentarily
    /// busy.
    fn claim_next(&self, stuck_threshold_secs: i64) -> StoreResult<Option<FrontierEntry>>;

    /// Marks a claimed URL done and records its visit outcome. Only called
    /// once the URL has actually been fetched (any HTTP status counts).
    fn mark_done(&self, id: i64, url: &str, status_code: Option<u16>) -> StoreResult<()>;

    /// Marks a claimed URL failed. No `VisitedRecord` is written: a failed
    /// entry was either never fetched (robots denial, bad URL) or never
    /// got a response (network error exhausting retries).
    fn mark_failed(&self, id: i64) -> StoreResult<()>;

    /// Returns a claimed URL to pending status for another worker to pick
    /// up. Retry count is unchanged here; it's bumped on the next
    /// `claim_next` that picks the URL back up.
    fn requeue(&self, id: i64) -> StoreResult<()>;

    /// Looks up an already-stored page by content hash, for deduplication.
    fn get_page_by_hash(&self, hash: &str) -> StoreResult<Option<String>>;

    /// Records page metadata and the path of the (possibly shared) stored
    /// body.
    #[allow(clippy::too_many_arguments)]
    fn save_page_metadata(
        &self,
        url: &str,
        content_path: &str,
        content_hash: &str,
        title: Option<&str>,
        meta_description: Option<&str>,
        status_code: Option<u16>,
    ) -> StoreResult<()>;

    /// Frontier status counts, for periodic progress reporting.
    fn stats(&self) -> StoreResult<StoreStats>;
}
