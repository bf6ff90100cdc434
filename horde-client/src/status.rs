//! Job status check endpoint

use reqwest::StatusCode;
use tracing::debug;

use crate::HordeClient;
use crate::error::{ClientError, Result};
use horde_core::dto::check::{CheckPayload, CheckResponse};

impl HordeClient {
    // =============================================================================
    // Status Checks
    // =============================================================================

    /// Check the status of a generation job
    ///
    /// Performs exactly one request per call. The result is never cached and
    /// the request is never retried here: the poll loop decides termination
    /// from these reads, so each one must reflect the remote service's current
    /// state.
    ///
    /// Every failure is folded into the returned [`CheckResponse`]:
    /// - HTTP 404 → [`CheckResponse::NotFound`]
    /// - HTTP 429 → [`CheckResponse::WaitingForPendingRequest`]
    /// - network errors, other error statuses, unparseable bodies and job ids
    ///   that are not a single path segment → [`CheckResponse::UnknownError`]
    pub async fn check_image_status(&self, job_id: &str) -> CheckResponse {
        match self.request_status(job_id).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Status check for job {} failed: {}", job_id, e);
                CheckResponse::UnknownError {
                    job_id: job_id.to_string(),
                }
            }
        }
    }

    async fn request_status(&self, job_id: &str) -> Result<CheckResponse> {
        let url = self.job_url("/api/v2/generate/check", job_id)?;
        let response = self
            .client
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?;

        let job_id = job_id.to_string();
        match response.status() {
            StatusCode::NOT_FOUND => Ok(CheckResponse::NotFound { job_id }),
            StatusCode::TOO_MANY_REQUESTS => Ok(CheckResponse::WaitingForPendingRequest { job_id }),
            status if !status.is_success() => Err(ClientError::api_error(
                status.as_u16(),
                "unexpected status on check",
            )),
            _ => {
                let check = response.json::<CheckPayload>().await.map_err(|e| {
                    ClientError::ParseError(format!("Failed to parse check response: {}", e))
                })?;
                Ok(CheckResponse::Status { job_id, check })
            }
        }
    }
}
