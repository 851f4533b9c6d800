//! Content-addressed storage for fetched page bodies.
//!
//! Bodies are named by the hex-encoded SHA-256 digest of their bytes, so
//! two URLs that fetch byte-identical content share one file on disk.
//! Writes are published via a temp-file-then-rename so a reader never
//! observes a partially written blob under its final name.

use crate::storage::Store;
use sha2::{Digest, Sha256};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct ContentStore {
    dir: PathBuf,
}

impl ContentStore {
    /// Creates a content store rooted at `dir`, creating the directory if
    /// it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Computes the hex SHA-256 digest of `bytes`.
    pub fn hash_of(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Path a blob with the given hash would be stored at.
    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.html"))
    }

    /// Writes `bytes` to disk under its content hash if not already
    /// present, publishing atomically via rename. Returns the path the
    /// blob now lives at (whether freshly written or already present).
    pub fn write(&self, hash: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let final_path = self.path_for(hash);
        if final_path.exists() {
            return Ok(final_path);
        }

        let unique = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self
            .dir
            .join(format!("{hash}.html.tmp-{}-{unique}", std::process::id()));
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(final_path)
    }

    /// Hashes `bytes`, reuses an existing blob for that hash via `store`'s
    /// dedup lookup if one is recorded, or writes a new one. Returns
    /// `(hash, path, newly_written)`.
    ///
    /// A lookup failure against `store` (a genuine store-layer error) is
    /// propagated as `Err`. A filesystem write failure, by contrast, is
    /// tolerated here rather than propagated: the caller records page
    /// metadata with an empty `content_path` instead, per the "blob write
    /// failure is not fatal" policy — so `newly_written` is `false` in
    /// that case even though no existing blob was found.
    pub fn store_or_link(&self, store: &dyn Store, bytes: &[u8]) -> io::Result<(String, PathBuf, bool)> {
        let hash = Self::hash_of(bytes);

        let existing = store
            .get_page_by_hash(&hash)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

        // An empty path means an earlier attempt for this hash hit a blob
        // write failure and recorded no real file (see the write-failure
        // branch below) — that's not a usable "existing" blob, so fall
        // through and retry the write rather than perpetuating the gap.
        if let Some(path) = existing {
            if !path.is_empty() {
                return Ok((hash, PathBuf::from(path), false));
            }
        }

        match self.write(&hash, bytes) {
            Ok(path) => Ok((hash, path, true)),
            Err(e) => {
                tracing::warn!(hash = %hash, error = %e, "failed to write page body");
                Ok((hash, PathBuf::new(), false))
            }
        }
    }
}
