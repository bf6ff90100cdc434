//! Horde Local Job Store
//!
//! SQLite-backed persistence of pending and completed generation jobs.
//!
//! The store is the single shared mutable resource of the client. All writes go
//! through its operations, which enforce:
//! - one record per job id across both sets
//! - monotonic status progression for pending jobs
//! - atomic, idempotent promotion from pending to completed

mod cache;
mod completed;
pub mod error;
mod pending;

pub use cache::CompletedCache;
pub use error::{Result, StoreError};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// How long a writer waits for another process (CLI or poller) to release the file
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of merging a status update into a pending record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update was written
    Applied,
    /// The update would regress the stored status, or the stored status is terminal
    Stale,
    /// No pending record exists for this job
    Missing,
}

/// Result of promoting a pending job to the completed set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteOutcome {
    /// A completed record was created with this local id
    Promoted { id: i64 },
    /// The job was already in the completed set; nothing was inserted
    AlreadyCompleted,
    /// The job is in neither set (e.g. the user deleted it)
    NotPending,
}

/// Local store of pending and completed jobs
///
/// The completed-record cache is only populated or invalidated while the
/// connection lock is held, so a reader can never re-insert a copy older than
/// a concurrent write.
pub struct LocalJobStore {
    conn: Mutex<Connection>,
    cache: CompletedCache,
}

impl LocalJobStore {
    /// Opens (or creates) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening job store at {}", path.display());
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            cache: CompletedCache::new(),
        })
    }

    /// Drops any cached copy of a completed record
    ///
    /// Store operations invalidate on their own; this is for callers that need
    /// a guaranteed fresh read.
    pub fn invalidate_completed(&self, job_id: &str) {
        let _conn = self.conn.lock();
        self.cache.invalidate(job_id);
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pending_jobs (
            job_id         TEXT PRIMARY KEY,
            status         TEXT NOT NULL,
            queue_position INTEGER,
            wait_time      INTEGER,
            observed       INTEGER NOT NULL DEFAULT 0,
            params         TEXT NOT NULL,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS completed_jobs (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id       TEXT NOT NULL UNIQUE,
            params       TEXT NOT NULL,
            image        TEXT NOT NULL,
            seed         TEXT,
            model        TEXT,
            worker_id    TEXT,
            worker_name  TEXT,
            favorited    INTEGER NOT NULL DEFAULT 0,
            shortlink    TEXT,
            created_at   TEXT NOT NULL,
            completed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_pending_created
            ON pending_jobs(created_at);
        CREATE INDEX IF NOT EXISTS idx_completed_favorited
            ON completed_jobs(favorited);
        ",
    )?;
    Ok(())
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use horde_core::domain::image::NewCompletedImage;
    use horde_core::domain::job::{JobStatus, PendingJob, PendingUpdate};
    use serde_json::json;
    use std::thread;

    #[test]
    fn test_open_file_store_is_reopenable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("horde.db");

        {
            let store = LocalJobStore::open(&path).unwrap();
            store
                .insert_pending(&PendingJob::new("abc123", json!({})))
                .unwrap();
        }

        let store = LocalJobStore::open(&path).unwrap();
        assert!(store.get_pending("abc123").unwrap().is_some());
    }

    #[test]
    fn test_handles_on_one_file_see_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("horde.db");
        let cli = LocalJobStore::open(&path).unwrap();
        let poller = LocalJobStore::open(&path).unwrap();

        cli.insert_pending(&PendingJob::new("abc123", json!({"prompt": "a cat"})))
            .unwrap();
        assert_eq!(
            poller
                .update_pending("abc123", &PendingUpdate::status(JobStatus::Processing))
                .unwrap(),
            UpdateOutcome::Applied
        );

        let record = NewCompletedImage {
            image: "aW1n".to_string(),
            seed: None,
            model: None,
            worker_id: None,
            worker_name: None,
            completed_at: Utc::now(),
        };
        assert!(matches!(
            poller.promote_to_completed("abc123", &record).unwrap(),
            PromoteOutcome::Promoted { .. }
        ));
        assert!(cli.get_pending("abc123").unwrap().is_none());
        assert!(cli.get_completed("abc123").unwrap().is_some());
    }

    #[test]
    fn test_concurrent_writers_on_one_file_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("horde.db");
        LocalJobStore::open(&path).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let path = path.clone();
                thread::spawn(move || {
                    let store = LocalJobStore::open(&path).unwrap();
                    for i in 0..25 {
                        let job_id = format!("job-{}-{}", w, i);
                        store
                            .insert_pending(&PendingJob::new(&job_id, json!({})))
                            .unwrap();
                        store
                            .update_pending(&job_id, &PendingUpdate::status(JobStatus::Processing))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let store = LocalJobStore::open(&path).unwrap();
        assert_eq!(store.list_pending().unwrap().len(), 100);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let parsed = parse_timestamp(&format_timestamp(now)).unwrap();
        assert_eq!(parsed, now);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
