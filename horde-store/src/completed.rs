//! Completed job operations and promotion

use horde_core::domain::image::{CompletedImage, NewCompletedImage};
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::{LocalJobStore, PromoteOutcome, format_timestamp, parse_timestamp};

const COMPLETED_COLUMNS: &str = "id, job_id, params, image, seed, model, worker_id, worker_name, \
     favorited, shortlink, created_at, completed_at";

struct CompletedRow {
    id: i64,
    job_id: String,
    params: String,
    image: String,
    seed: Option<String>,
    model: Option<String>,
    worker_id: Option<String>,
    worker_name: Option<String>,
    favorited: bool,
    shortlink: Option<String>,
    created_at: String,
    completed_at: String,
}

impl CompletedRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            job_id: row.get(1)?,
            params: row.get(2)?,
            image: row.get(3)?,
            seed: row.get(4)?,
            model: row.get(5)?,
            worker_id: row.get(6)?,
            worker_name: row.get(7)?,
            favorited: row.get(8)?,
            shortlink: row.get(9)?,
            created_at: row.get(10)?,
            completed_at: row.get(11)?,
        })
    }
}

impl TryFrom<CompletedRow> for CompletedImage {
    type Error = StoreError;

    fn try_from(row: CompletedRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            job_id: row.job_id,
            params: serde_json::from_str(&row.params)?,
            image: row.image,
            seed: row.seed,
            model: row.model,
            worker_id: row.worker_id,
            worker_name: row.worker_name,
            favorited: row.favorited,
            shortlink: row.shortlink,
            created_at: parse_timestamp(&row.created_at)?,
            completed_at: parse_timestamp(&row.completed_at)?,
        })
    }
}

impl LocalJobStore {
    /// Moves a pending job into the completed set
    ///
    /// Both the pending-row deletion and the completed-row insertion happen in
    /// one transaction. Re-running on an already promoted job inserts nothing;
    /// it only clears a leftover pending row, if any.
    pub fn promote_to_completed(
        &self,
        job_id: &str,
        record: &NewCompletedImage,
    ) -> Result<PromoteOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let already: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM completed_jobs WHERE job_id = ?1)",
            params![job_id],
            |row| row.get(0),
        )?;
        if already {
            let cleared = tx.execute(
                "DELETE FROM pending_jobs WHERE job_id = ?1",
                params![job_id],
            )?;
            tx.commit()?;
            debug!(
                "Job {} already completed (cleared {} pending row(s))",
                job_id, cleared
            );
            return Ok(PromoteOutcome::AlreadyCompleted);
        }

        let pending: Option<(String, String)> = tx
            .query_row(
                "SELECT params, created_at FROM pending_jobs WHERE job_id = ?1",
                params![job_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((params_json, created_at)) = pending else {
            return Ok(PromoteOutcome::NotPending);
        };

        tx.execute(
            "INSERT INTO completed_jobs
                 (job_id, params, image, seed, model, worker_id, worker_name,
                  favorited, shortlink, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, ?8, ?9)",
            params![
                job_id,
                params_json,
                record.image,
                record.seed,
                record.model,
                record.worker_id,
                record.worker_name,
                created_at,
                format_timestamp(record.completed_at),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "DELETE FROM pending_jobs WHERE job_id = ?1",
            params![job_id],
        )?;
        tx.commit()?;

        self.cache.invalidate(job_id);
        info!("Promoted job {} to completed (id {})", job_id, id);
        Ok(PromoteOutcome::Promoted { id })
    }

    /// Finds a completed job by job id, reading through the cache
    pub fn get_completed(&self, job_id: &str) -> Result<Option<CompletedImage>> {
        if let Some(hit) = self.cache.get(job_id) {
            return Ok(Some(hit));
        }

        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM completed_jobs WHERE job_id = ?1",
                    COMPLETED_COLUMNS
                ),
                params![job_id],
                CompletedRow::from_row,
            )
            .optional()?;

        let image = row.map(CompletedImage::try_from).transpose()?;
        if let Some(image) = &image {
            self.cache.set(image.clone());
        }
        Ok(image)
    }

    /// Finds a completed job by its local id
    pub fn get_completed_by_id(&self, id: i64) -> Result<Option<CompletedImage>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM completed_jobs WHERE id = ?1", COMPLETED_COLUMNS),
                params![id],
                CompletedRow::from_row,
            )
            .optional()?;

        row.map(CompletedImage::try_from).transpose()
    }

    /// Lists completed jobs, newest first
    pub fn list_completed(&self, favorites_only: bool) -> Result<Vec<CompletedImage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM completed_jobs WHERE (?1 = 0 OR favorited = 1) ORDER BY id DESC",
            COMPLETED_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![favorites_only], CompletedRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(CompletedImage::try_from).collect()
    }

    /// Sets the user's favorite flag on a completed job
    ///
    /// Returns whether the job exists.
    pub fn set_favorite(&self, job_id: &str, favorited: bool) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE completed_jobs SET favorited = ?1 WHERE job_id = ?2",
            params![favorited, job_id],
        )?;
        self.cache.invalidate(job_id);
        Ok(updated > 0)
    }

    /// Records the shortlink of a completed job
    ///
    /// The first stored link wins. Returns the link now stored, which differs
    /// from `shortlink` if one was already set, or `None` if the job does not exist.
    pub fn set_shortlink(&self, job_id: &str, shortlink: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE completed_jobs SET shortlink = ?1 WHERE job_id = ?2 AND shortlink IS NULL",
            params![shortlink, job_id],
        )?;
        self.cache.invalidate(job_id);

        let stored: Option<Option<String>> = conn
            .query_row(
                "SELECT shortlink FROM completed_jobs WHERE job_id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stored.flatten())
    }

    /// Removes a job from the completed set
    ///
    /// Returns whether a record was removed.
    pub fn delete_completed(&self, job_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM completed_jobs WHERE job_id = ?1",
            params![job_id],
        )?;
        self.cache.invalidate(job_id);
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use horde_core::domain::job::PendingJob;
    use serde_json::json;

    fn record(image: &str) -> NewCompletedImage {
        NewCompletedImage {
            image: image.to_string(),
            seed: Some("42".to_string()),
            model: Some("stable_diffusion".to_string()),
            worker_id: Some("w-1".to_string()),
            worker_name: Some("Worker One".to_string()),
            completed_at: Utc::now(),
        }
    }

    fn store_with(job_id: &str) -> LocalJobStore {
        let store = LocalJobStore::open_in_memory().unwrap();
        store
            .insert_pending(&PendingJob::new(job_id, json!({"prompt": "a cat"})))
            .unwrap();
        store
    }

    #[test]
    fn test_promote_moves_job_between_sets() {
        let store = store_with("abc123");
        let outcome = store
            .promote_to_completed("abc123", &record("UklGRg=="))
            .unwrap();
        assert!(matches!(outcome, PromoteOutcome::Promoted { .. }));

        assert!(store.get_pending("abc123").unwrap().is_none());
        let image = store.get_completed("abc123").unwrap().unwrap();
        assert_eq!(image.params, json!({"prompt": "a cat"}));
        assert_eq!(image.seed.as_deref(), Some("42"));
        assert!(!image.favorited);
    }

    #[test]
    fn test_promote_is_idempotent() {
        let store = store_with("abc123");
        store
            .promote_to_completed("abc123", &record("first"))
            .unwrap();
        let second = store
            .promote_to_completed("abc123", &record("second"))
            .unwrap();

        assert_eq!(second, PromoteOutcome::AlreadyCompleted);
        let all = store.list_completed(false).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].image, "first");
    }

    #[test]
    fn test_promote_without_pending_record_inserts_nothing() {
        let store = LocalJobStore::open_in_memory().unwrap();
        let outcome = store
            .promote_to_completed("ghost", &record("img"))
            .unwrap();
        assert_eq!(outcome, PromoteOutcome::NotPending);
        assert!(store.list_completed(false).unwrap().is_empty());
    }

    #[test]
    fn test_completed_job_cannot_be_reinserted_as_pending() {
        let store = store_with("abc123");
        store
            .promote_to_completed("abc123", &record("img"))
            .unwrap();
        let err = store
            .insert_pending(&PendingJob::new("abc123", json!({})))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn test_favorite_is_visible_through_cache() {
        let store = store_with("abc123");
        store
            .promote_to_completed("abc123", &record("img"))
            .unwrap();

        // Warm the cache
        assert!(!store.get_completed("abc123").unwrap().unwrap().favorited);

        assert!(store.set_favorite("abc123", true).unwrap());
        assert!(store.get_completed("abc123").unwrap().unwrap().favorited);
        assert!(!store.set_favorite("ghost", true).unwrap());
    }

    #[test]
    fn test_invalidate_forces_fresh_read() {
        let store = store_with("abc123");
        store
            .promote_to_completed("abc123", &record("img"))
            .unwrap();
        store.get_completed("abc123").unwrap();

        // Write behind the cache's back
        store
            .conn
            .lock()
            .execute(
                "UPDATE completed_jobs SET model = 'other' WHERE job_id = 'abc123'",
                [],
            )
            .unwrap();
        assert_eq!(
            store.get_completed("abc123").unwrap().unwrap().model.as_deref(),
            Some("stable_diffusion")
        );

        store.invalidate_completed("abc123");
        assert_eq!(
            store.get_completed("abc123").unwrap().unwrap().model.as_deref(),
            Some("other")
        );
    }

    #[test]
    fn test_shortlink_is_set_once() {
        let store = store_with("abc123");
        store
            .promote_to_completed("abc123", &record("img"))
            .unwrap();

        assert_eq!(
            store.set_shortlink("abc123", "x7Kp").unwrap().as_deref(),
            Some("x7Kp")
        );
        assert_eq!(
            store.set_shortlink("abc123", "other").unwrap().as_deref(),
            Some("x7Kp")
        );
        assert_eq!(
            store.get_completed("abc123").unwrap().unwrap().shortlink.as_deref(),
            Some("x7Kp")
        );
        assert_eq!(store.set_shortlink("ghost", "x").unwrap(), None);
    }

    #[test]
    fn test_list_favorites_only() {
        let store = LocalJobStore::open_in_memory().unwrap();
        for id in ["a", "b", "c"] {
            store.insert_pending(&PendingJob::new(id, json!({}))).unwrap();
            store.promote_to_completed(id, &record("img")).unwrap();
        }
        store.set_favorite("b", true).unwrap();

        let favorites = store.list_completed(true).unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].job_id, "b");

        let ids: Vec<String> = store
            .list_completed(false)
            .unwrap()
            .into_iter()
            .map(|i| i.job_id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_delete_completed_and_lookup_by_id() {
        let store = store_with("abc123");
        let PromoteOutcome::Promoted { id } = store
            .promote_to_completed("abc123", &record("img"))
            .unwrap()
        else {
            panic!("expected promotion");
        };

        assert_eq!(
            store.get_completed_by_id(id).unwrap().map(|i| i.job_id),
            Some("abc123".to_string())
        );
        store.get_completed("abc123").unwrap();

        assert!(store.delete_completed("abc123").unwrap());
        assert!(store.get_completed("abc123").unwrap().is_none());
        assert!(!store.delete_completed("abc123").unwrap());
    }
}
