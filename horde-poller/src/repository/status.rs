//! Status repository
//!
//! Handles communication with Horde for job tracking:
//! - Checking job status
//! - Fetching finished generations and their images
//! - Service heartbeats

use anyhow::{Context, Result};
use async_trait::async_trait;
use horde_client::{CheckResponse, HordeClient};
use horde_core::dto::generate::GenerationStatus;

/// Repository trait for job status operations against Horde
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Checks the status of a job
    ///
    /// Issues exactly one request and never fails: errors are folded into
    /// the returned [`CheckResponse`].
    ///
    /// # Arguments
    /// * `job_id` - The job to check
    async fn check_status(&self, job_id: &str) -> CheckResponse;

    /// Fetches the finished generations of a job
    ///
    /// # Arguments
    /// * `job_id` - A job a status check reported as done
    async fn fetch_result(&self, job_id: &str) -> Result<GenerationStatus>;

    /// Downloads an image served from object storage
    ///
    /// # Arguments
    /// * `url` - Download link carried by a generation
    async fn download_image(&self, url: &str) -> Result<Vec<u8>>;

    /// Checks that Horde is online
    async fn heartbeat(&self) -> Result<()>;
}

/// HTTP implementation of StatusRepository
pub struct HttpStatusRepository {
    client: HordeClient,
}

impl HttpStatusRepository {
    /// Creates a new HTTP status repository
    ///
    /// # Arguments
    /// * `client` - Configured Horde client
    pub fn new(client: HordeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusRepository for HttpStatusRepository {
    async fn check_status(&self, job_id: &str) -> CheckResponse {
        self.client.check_image_status(job_id).await
    }

    async fn fetch_result(&self, job_id: &str) -> Result<GenerationStatus> {
        self.client
            .fetch_generation(job_id)
            .await
            .with_context(|| format!("Failed to fetch result for job {}", job_id))
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        self.client
            .download_image(url)
            .await
            .context("Failed to download image")
    }

    async fn heartbeat(&self) -> Result<()> {
        self.client
            .heartbeat()
            .await
            .context("Horde heartbeat failed")
    }
}
