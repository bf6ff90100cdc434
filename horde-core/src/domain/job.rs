//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a generation job as seen by the local client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Waiting,
    Processing,
    Done,
    Faulted,
    NotFound,
    UnknownError,
}

impl JobStatus {
    /// No further polling happens once a job reaches one of these.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Faulted | Self::NotFound)
    }

    /// Transient statuses describe a failed observation, not the job itself,
    /// and are never persisted.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::UnknownError)
    }

    /// Position in the status progression. Stored statuses only move forward.
    pub fn rank(self) -> u8 {
        match self {
            Self::UnknownError | Self::Waiting => 0,
            Self::Processing => 1,
            Self::Done | Self::Faulted | Self::NotFound => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Processing => "PROCESSING",
            Self::Done => "DONE",
            Self::Faulted => "FAULTED",
            Self::NotFound => "NOT_FOUND",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(Self::Waiting),
            "PROCESSING" => Ok(Self::Processing),
            "DONE" => Ok(Self::Done),
            "FAULTED" => Ok(Self::Faulted),
            "NOT_FOUND" => Ok(Self::NotFound),
            "UNKNOWN_ERROR" => Ok(Self::UnknownError),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// A job that has been accepted by Horde but has no persisted result yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingJob {
    /// Identifier assigned by the remote service at submission time
    pub job_id: String,
    pub status: JobStatus,
    /// Advisory only, may be stale
    pub queue_position: Option<u32>,
    /// Advisory only, in seconds
    pub wait_time: Option<u32>,
    /// Set once any successful status check has been applied
    pub observed: bool,
    /// Generation request that produced this job
    pub params: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingJob {
    /// Creates a freshly submitted job in the `WAITING` state
    pub fn new(job_id: impl Into<String>, params: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            status: JobStatus::Waiting,
            queue_position: None,
            wait_time: None,
            observed: false,
            params,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied to a pending job by the poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub status: JobStatus,
    pub queue_position: Option<u32>,
    pub wait_time: Option<u32>,
    pub observed: bool,
}

impl PendingUpdate {
    /// An update that only moves the status
    pub fn status(status: JobStatus) -> Self {
        Self {
            status,
            queue_position: None,
            wait_time: None,
            observed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Faulted.is_terminal());
        assert!(JobStatus::NotFound.is_terminal());
        assert!(!JobStatus::Waiting.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::UnknownError.is_terminal());
    }

    #[test]
    fn test_rank_is_monotonic_along_lifecycle() {
        assert!(JobStatus::Waiting.rank() < JobStatus::Processing.rank());
        assert!(JobStatus::Processing.rank() < JobStatus::Done.rank());
        assert_eq!(JobStatus::Done.rank(), JobStatus::Faulted.rank());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            JobStatus::Waiting,
            JobStatus::Processing,
            JobStatus::Done,
            JobStatus::Faulted,
            JobStatus::NotFound,
            JobStatus::UnknownError,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
        }
        assert!("RUNNING".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&JobStatus::NotFound).unwrap();
        assert_eq!(json, "\"NOT_FOUND\"");
    }

    #[test]
    fn test_new_pending_job_starts_waiting_and_unobserved() {
        let job = PendingJob::new("abc123", serde_json::json!({"prompt": "a cat"}));
        assert_eq!(job.status, JobStatus::Waiting);
        assert!(!job.observed);
        assert_eq!(job.created_at, job.updated_at);
    }
}
