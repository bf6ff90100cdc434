//! Pending job operations

use chrono::Utc;
use horde_core::domain::job::{JobStatus, PendingJob, PendingUpdate};
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::{LocalJobStore, UpdateOutcome, format_timestamp, parse_timestamp};

const PENDING_COLUMNS: &str =
    "job_id, status, queue_position, wait_time, observed, params, created_at, updated_at";

/// Raw pending row, decoded into a [`PendingJob`] outside the SQLite callback
struct PendingRow {
    job_id: String,
    status: String,
    queue_position: Option<u32>,
    wait_time: Option<u32>,
    observed: bool,
    params: String,
    created_at: String,
    updated_at: String,
}

impl PendingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            job_id: row.get(0)?,
            status: row.get(1)?,
            queue_position: row.get(2)?,
            wait_time: row.get(3)?,
            observed: row.get(4)?,
            params: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TryFrom<PendingRow> for PendingJob {
    type Error = StoreError;

    fn try_from(row: PendingRow) -> Result<Self> {
        Ok(Self {
            status: row.status.parse().map_err(StoreError::InvalidData)?,
            queue_position: row.queue_position,
            wait_time: row.wait_time,
            observed: row.observed,
            params: serde_json::from_str(&row.params)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
            job_id: row.job_id,
        })
    }
}

impl LocalJobStore {
    /// Adds a newly submitted job to the pending set
    ///
    /// Fails with [`StoreError::Duplicate`] if the job id is already tracked,
    /// pending or completed.
    pub fn insert_pending(&self, job: &PendingJob) -> Result<()> {
        if job.status.is_transient() {
            return Err(StoreError::InvalidData(format!(
                "cannot persist transient status {}",
                job.status
            )));
        }

        let params = serde_json::to_string(&job.params)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let tracked: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM pending_jobs WHERE job_id = ?1)
                 OR EXISTS(SELECT 1 FROM completed_jobs WHERE job_id = ?1)",
            params![job.job_id],
            |row| row.get(0),
        )?;
        if tracked {
            return Err(StoreError::Duplicate(job.job_id.clone()));
        }

        tx.execute(
            "INSERT INTO pending_jobs
                 (job_id, status, queue_position, wait_time, observed, params, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.job_id,
                job.status.as_str(),
                job.queue_position,
                job.wait_time,
                job.observed,
                params,
                format_timestamp(job.created_at),
                format_timestamp(job.updated_at),
            ],
        )?;
        tx.commit()?;

        debug!("Inserted pending job {}", job.job_id);
        Ok(())
    }

    /// Finds a pending job by id
    pub fn get_pending(&self, job_id: &str) -> Result<Option<PendingJob>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM pending_jobs WHERE job_id = ?1", PENDING_COLUMNS),
                params![job_id],
                PendingRow::from_row,
            )
            .optional()?;

        row.map(PendingJob::try_from).transpose()
    }

    /// Lists pending jobs, oldest first
    pub fn list_pending(&self) -> Result<Vec<PendingJob>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pending_jobs ORDER BY created_at ASC, job_id ASC",
            PENDING_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], PendingRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(PendingJob::try_from).collect()
    }

    /// Merges a status update into a pending job
    ///
    /// Status only moves forward: an update ranking below the stored status,
    /// or any update once the stored status is terminal, is dropped as
    /// [`UpdateOutcome::Stale`]. Transient statuses are never written.
    pub fn update_pending(&self, job_id: &str, update: &PendingUpdate) -> Result<UpdateOutcome> {
        if update.status.is_transient() {
            return Ok(UpdateOutcome::Stale);
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored: Option<String> = tx
            .query_row(
                "SELECT status FROM pending_jobs WHERE job_id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(stored) = stored else {
            return Ok(UpdateOutcome::Missing);
        };
        let stored: JobStatus = stored.parse().map_err(StoreError::InvalidData)?;

        if stored.is_terminal() || update.status.rank() < stored.rank() {
            debug!(
                "Dropping stale update for job {}: {} -> {}",
                job_id, stored, update.status
            );
            return Ok(UpdateOutcome::Stale);
        }

        tx.execute(
            "UPDATE pending_jobs
             SET status = ?1, queue_position = ?2, wait_time = ?3,
                 observed = observed OR ?4, updated_at = ?5
             WHERE job_id = ?6",
            params![
                update.status.as_str(),
                update.queue_position,
                update.wait_time,
                update.observed,
                format_timestamp(Utc::now()),
                job_id,
            ],
        )?;
        tx.commit()?;

        Ok(UpdateOutcome::Applied)
    }

    /// Removes a job from the pending set
    ///
    /// Returns whether a record was removed.
    pub fn delete_pending(&self, job_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM pending_jobs WHERE job_id = ?1",
            params![job_id],
        )?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(job_id: &str) -> LocalJobStore {
        let store = LocalJobStore::open_in_memory().unwrap();
        store
            .insert_pending(&PendingJob::new(job_id, json!({"prompt": "a cat"})))
            .unwrap();
        store
    }

    fn progress(status: JobStatus, queue_position: u32) -> PendingUpdate {
        PendingUpdate {
            status,
            queue_position: Some(queue_position),
            wait_time: Some(30),
            observed: true,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = store_with("abc123");
        let job = store.get_pending("abc123").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.params, json!({"prompt": "a cat"}));
        assert!(store.get_pending("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_is_rejected() {
        let store = store_with("abc123");
        let err = store
            .insert_pending(&PendingJob::new("abc123", json!({})))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "abc123"));
        assert_eq!(store.list_pending().unwrap().len(), 1);
    }

    #[test]
    fn test_insert_transient_status_is_rejected() {
        let store = LocalJobStore::open_in_memory().unwrap();
        let mut job = PendingJob::new("abc123", json!({}));
        job.status = JobStatus::UnknownError;
        assert!(matches!(
            store.insert_pending(&job),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_update_applies_progress() {
        let store = store_with("abc123");
        let outcome = store
            .update_pending("abc123", &progress(JobStatus::Processing, 3))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);

        let job = store.get_pending("abc123").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.queue_position, Some(3));
        assert!(job.observed);
    }

    #[test]
    fn test_update_same_status_refreshes_advisory_fields() {
        let store = store_with("abc123");
        store
            .update_pending("abc123", &progress(JobStatus::Waiting, 9))
            .unwrap();
        store
            .update_pending("abc123", &progress(JobStatus::Waiting, 4))
            .unwrap();
        let job = store.get_pending("abc123").unwrap().unwrap();
        assert_eq!(job.queue_position, Some(4));
    }

    #[test]
    fn test_update_never_regresses() {
        let store = store_with("abc123");
        store
            .update_pending("abc123", &progress(JobStatus::Processing, 0))
            .unwrap();

        let outcome = store
            .update_pending("abc123", &progress(JobStatus::Waiting, 5))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Stale);
        assert_eq!(
            store.get_pending("abc123").unwrap().unwrap().status,
            JobStatus::Processing
        );
    }

    #[test]
    fn test_waiting_after_done_is_dropped() {
        let store = store_with("abc123");
        store
            .update_pending("abc123", &PendingUpdate::status(JobStatus::Done))
            .unwrap();

        let outcome = store
            .update_pending("abc123", &progress(JobStatus::Waiting, 1))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Stale);
        assert_eq!(
            store.get_pending("abc123").unwrap().unwrap().status,
            JobStatus::Done
        );
    }

    #[test]
    fn test_terminal_status_is_final() {
        let store = store_with("abc123");
        store
            .update_pending("abc123", &PendingUpdate::status(JobStatus::Faulted))
            .unwrap();
        let outcome = store
            .update_pending("abc123", &PendingUpdate::status(JobStatus::Done))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Stale);
    }

    #[test]
    fn test_transient_update_is_not_written() {
        let store = store_with("abc123");
        let outcome = store
            .update_pending("abc123", &PendingUpdate::status(JobStatus::UnknownError))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Stale);
        assert_eq!(
            store.get_pending("abc123").unwrap().unwrap().status,
            JobStatus::Waiting
        );
    }

    #[test]
    fn test_observed_flag_is_sticky() {
        let store = store_with("abc123");
        store
            .update_pending("abc123", &progress(JobStatus::Waiting, 2))
            .unwrap();
        store
            .update_pending("abc123", &PendingUpdate::status(JobStatus::Processing))
            .unwrap();
        assert!(store.get_pending("abc123").unwrap().unwrap().observed);
    }

    #[test]
    fn test_update_missing_job() {
        let store = LocalJobStore::open_in_memory().unwrap();
        let outcome = store
            .update_pending("ghost", &progress(JobStatus::Processing, 1))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
    }

    #[test]
    fn test_delete_pending() {
        let store = store_with("abc123");
        assert!(store.delete_pending("abc123").unwrap());
        assert!(!store.delete_pending("abc123").unwrap());
        assert_eq!(
            store
                .update_pending("abc123", &progress(JobStatus::Processing, 1))
                .unwrap(),
            UpdateOutcome::Missing
        );
    }

    #[test]
    fn test_list_pending_oldest_first() {
        let store = LocalJobStore::open_in_memory().unwrap();
        let mut older = PendingJob::new("second-id", json!({}));
        older.created_at = older.created_at - chrono::Duration::minutes(5);
        store.insert_pending(&PendingJob::new("first-id", json!({}))).unwrap();
        store.insert_pending(&older).unwrap();

        let ids: Vec<String> = store
            .list_pending()
            .unwrap()
            .into_iter()
            .map(|j| j.job_id)
            .collect();
        assert_eq!(ids, vec!["second-id", "first-id"]);
    }
}
