//! Completed image domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job with a persisted, successful result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedImage {
    /// Local auto-increment identifier
    pub id: i64,
    pub job_id: String,
    pub params: serde_json::Value,
    /// Base64 image payload, or a download URL when Horde serves images from storage
    pub image: String,
    pub seed: Option<String>,
    pub model: Option<String>,
    pub worker_id: Option<String>,
    pub worker_name: Option<String>,
    pub favorited: bool,
    /// Set at most once
    pub shortlink: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Everything needed to promote a pending job into the completed set
#[derive(Debug, Clone, PartialEq)]
pub struct NewCompletedImage {
    pub image: String,
    pub seed: Option<String>,
    pub model: Option<String>,
    pub worker_id: Option<String>,
    pub worker_name: Option<String>,
    pub completed_at: DateTime<Utc>,
}
