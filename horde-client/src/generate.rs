//! Generation submission and result endpoints

use crate::error::{ClientError, Result};
use crate::{API_KEY_HEADER, HordeClient};
use horde_core::dto::generate::{GenerationRequest, GenerationStatus, SubmittedJob};
use reqwest::header::HeaderValue;

impl HordeClient {
    // =============================================================================
    // Job Submission
    // =============================================================================

    /// Submit an asynchronous generation request
    ///
    /// # Arguments
    /// * `req` - The generation request
    ///
    /// # Returns
    /// The job assigned by Horde. Its `id` is the key used by every later call.
    ///
    /// # Example
    /// ```no_run
    /// # use horde_client::HordeClient;
    /// # use horde_core::dto::generate::{GenerationParams, GenerationRequest};
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = HordeClient::new("https://stablehorde.net", "my-app:1.0:unknown");
    /// let job = client.submit_generation(&GenerationRequest {
    ///     prompt: "a lighthouse at dusk".to_string(),
    ///     params: GenerationParams::default(),
    ///     models: vec![],
    ///     nsfw: false,
    ///     censor_nsfw: true,
    ///     r2: false,
    /// }).await?;
    /// println!("Submitted job {}", job.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit_generation(&self, req: &GenerationRequest) -> Result<SubmittedJob> {
        if req.prompt.trim().is_empty() {
            return Err(ClientError::InvalidRequest("prompt is empty".to_string()));
        }

        let url = format!("{}/api/v2/generate/async", self.base_url);
        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| ClientError::InvalidRequest("API key is not a valid header".to_string()))?;

        let response = self
            .client
            .post(&url)
            .headers(self.default_headers())
            .header(API_KEY_HEADER, api_key)
            .json(req)
            .send()
            .await?;

        let job: SubmittedJob = self.handle_response(response).await?;
        if job.id.is_empty() {
            return Err(ClientError::ParseError(
                "submission response carried no job id".to_string(),
            ));
        }

        Ok(job)
    }

    // =============================================================================
    // Job Results
    // =============================================================================

    /// Fetch the full status of a job, including generated images
    ///
    /// This endpoint is heavier than a status check and should only be called
    /// once a check has reported the job as done.
    ///
    /// # Arguments
    /// * `job_id` - The job identifier returned at submission
    pub async fn fetch_generation(&self, job_id: &str) -> Result<GenerationStatus> {
        let url = self.job_url("/api/v2/generate/status", job_id)?;
        let response = self
            .client
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Download an image Horde serves from object storage
    ///
    /// Generations requested with `r2` carry a short-lived download link
    /// instead of inline data; the bytes must be fetched before it expires.
    ///
    /// # Arguments
    /// * `url` - The `img` link of a generation
    pub async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ClientError::InvalidRequest(format!(
                "not a download link: {}",
                url
            )));
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::api_error(
                status.as_u16(),
                "image download failed",
            ));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ClientError::ParseError("downloaded image is empty".to_string()));
        }

        Ok(bytes.to_vec())
    }
}
