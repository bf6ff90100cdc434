//! Status check DTOs

use serde::{Deserialize, Serialize, Serializer};

use crate::domain::job::JobStatus;

/// Body returned by `GET /api/v2/generate/check/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckPayload {
    pub finished: u32,
    pub processing: u32,
    pub restarted: u32,
    pub waiting: u32,
    pub done: bool,
    pub faulted: bool,
    pub wait_time: u32,
    pub queue_position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kudos: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_possible: Option<bool>,
}

impl CheckPayload {
    /// The job status this payload reports
    pub fn implied_status(&self) -> JobStatus {
        if self.faulted {
            JobStatus::Faulted
        } else if self.done {
            JobStatus::Done
        } else if self.processing > 0 || self.finished > 0 {
            JobStatus::Processing
        } else {
            JobStatus::Waiting
        }
    }
}

/// Outcome of a single status check
///
/// Every network, HTTP or parse failure is folded into one of the failure
/// variants, so callers never handle errors from a status check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResponse {
    /// The remote service answered with a status payload
    Status { job_id: String, check: CheckPayload },
    /// HTTP 404: the remote service does not know this job
    NotFound { job_id: String },
    /// HTTP 429: status checks are being rate limited, back off
    WaitingForPendingRequest { job_id: String },
    /// Network failure, unparseable body or unexpected status code
    UnknownError { job_id: String },
}

impl CheckResponse {
    pub fn job_id(&self) -> &str {
        match self {
            Self::Status { job_id, .. }
            | Self::NotFound { job_id }
            | Self::WaitingForPendingRequest { job_id }
            | Self::UnknownError { job_id } => job_id,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// Failure code, `None` on success
    pub fn status(&self) -> Option<&'static str> {
        match self {
            Self::Status { .. } => None,
            Self::NotFound { .. } => Some("NOT_FOUND"),
            Self::WaitingForPendingRequest { .. } => Some("WAITING_FOR_PENDING_REQUEST"),
            Self::UnknownError { .. } => Some("UNKNOWN_ERROR"),
        }
    }
}

impl Serialize for CheckResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Success<'a> {
            success: bool,
            #[serde(rename = "jobId")]
            job_id: &'a str,
            #[serde(flatten)]
            check: &'a CheckPayload,
        }

        #[derive(Serialize)]
        struct Failure<'a> {
            success: bool,
            status: &'static str,
            #[serde(rename = "jobId")]
            job_id: &'a str,
        }

        match self {
            Self::Status { job_id, check } => Success {
                success: true,
                job_id,
                check,
            }
            .serialize(serializer),
            other => Failure {
                success: false,
                status: other.status().unwrap_or("UNKNOWN_ERROR"),
                job_id: other.job_id(),
            }
            .serialize(serializer),
        }
    }
}
