//! Horde HTTP Client
//!
//! A small, type-safe HTTP client for the Horde image generation API.
//!
//! The client is shared by the CLI (job submission, one-shot checks) and the
//! poller (status checks, result retrieval, heartbeats).
//!
//! # Example
//!
//! ```no_run
//! use horde_client::HordeClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HordeClient::new("https://stablehorde.net", "my-app:1.0:me@example.com");
//!
//!     let response = client.check_image_status("abc123").await;
//!     println!("success: {}", response.success());
//!     Ok(())
//! }
//! ```

pub mod error;
mod generate;
mod health;
mod status;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use horde_core::dto::check::{CheckPayload, CheckResponse};

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Header identifying the calling application to Horde (`Client-Agent`)
pub const CLIENT_AGENT_HEADER: &str = "client-agent";

/// Header carrying the user's API key on authenticated endpoints
pub const API_KEY_HEADER: &str = "apikey";

/// Key Horde accepts for anonymous usage
pub const ANONYMOUS_API_KEY: &str = "0000000000";

/// Checks that `agent` can be sent as the `Client-Agent` header
///
/// Horde identifies callers by this header, so an agent that cannot be
/// encoded must be rejected up front instead of silently omitted.
pub fn validate_client_agent(agent: &str) -> Result<()> {
    if agent.trim().is_empty() {
        return Err(ClientError::InvalidRequest(
            "client agent cannot be empty".to_string(),
        ));
    }
    HeaderValue::from_str(agent).map_err(|_| {
        ClientError::InvalidRequest(format!("client agent {:?} is not a valid header value", agent))
    })?;
    Ok(())
}

/// Checks that `job_id` can be used as a single URL path segment
///
/// Horde job ids are UUIDs; anything outside `[A-Za-z0-9_-]` could escape the
/// intended endpoint.
pub fn validate_job_id(job_id: &str) -> Result<()> {
    if job_id.is_empty() {
        return Err(ClientError::InvalidRequest("empty job id".to_string()));
    }
    if !job_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ClientError::InvalidRequest(format!(
            "invalid job id '{}'",
            job_id
        )));
    }
    Ok(())
}

/// HTTP client for the Horde API
///
/// Endpoints are organized into logical groups:
/// - Status checks (never cached, never retried)
/// - Job submission and result retrieval
/// - Service heartbeat
#[derive(Debug, Clone)]
pub struct HordeClient {
    /// Base URL of the Horde API (e.g., "https://stablehorde.net")
    base_url: String,
    /// Value sent in the `Client-Agent` header
    client_agent: String,
    /// Key sent with submissions
    api_key: String,
    /// HTTP client instance
    client: Client,
}

impl HordeClient {
    /// Create a new Horde client using the anonymous API key
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the Horde API
    /// * `client_agent` - Identifies this application, conventionally `name:version:contact`
    ///
    /// # Example
    /// ```
    /// use horde_client::HordeClient;
    ///
    /// let client = HordeClient::new("https://stablehorde.net", "my-app:1.0:unknown");
    /// ```
    pub fn new(base_url: impl Into<String>, client_agent: impl Into<String>) -> Self {
        Self::with_client(base_url, client_agent, Client::new())
    }

    /// Create a new Horde client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    /// The client must not add a response cache: status checks rely on
    /// reaching the remote service every time.
    pub fn with_client(
        base_url: impl Into<String>,
        client_agent: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_agent: client_agent.into(),
            api_key: ANONYMOUS_API_KEY.to_string(),
            client,
        }
    }

    /// Use the given API key for submissions
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Get the base URL of the Horde API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the client agent sent with every request
    pub fn client_agent(&self) -> &str {
        &self.client_agent
    }

    /// URL of a per-job endpoint, rejecting ids that are not a single path segment
    fn job_url(&self, endpoint: &str, job_id: &str) -> Result<String> {
        validate_job_id(job_id)?;
        Ok(format!("{}{}/{}", self.base_url, endpoint, job_id))
    }

    /// Headers attached to every request
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match HeaderValue::from_str(&self.client_agent) {
            Ok(agent) => {
                headers.insert(CLIENT_AGENT_HEADER, agent);
            }
            Err(_) => warn!(
                "Client agent {:?} is not a valid header value, sending request without it",
                self.client_agent
            ),
        }
        headers
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is irrelevant
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HordeClient::new("https://stablehorde.net", "test:1:me");
        assert_eq!(client.base_url(), "https://stablehorde.net");
        assert_eq!(client.client_agent(), "test:1:me");
        assert_eq!(client.api_key, ANONYMOUS_API_KEY);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HordeClient::new("https://stablehorde.net/", "test:1:me");
        assert_eq!(client.base_url(), "https://stablehorde.net");
    }

    #[test]
    fn test_default_headers() {
        let client = HordeClient::new("http://localhost", "test:1:me");
        let headers = client.default_headers();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[CLIENT_AGENT_HEADER], "test:1:me");
    }

    #[test]
    fn test_validate_client_agent() {
        assert!(validate_client_agent("my-app:1.0:me@example.com").is_ok());
        assert!(matches!(
            validate_client_agent("my-app:1.0:me\n"),
            Err(ClientError::InvalidRequest(_))
        ));
        assert!(validate_client_agent("  ").is_err());
    }

    #[test]
    fn test_validate_job_id() {
        assert!(validate_job_id("0b2c9a4e-1f7d-4c3e-9a51-6d2f3e8b7c10").is_ok());
        assert!(validate_job_id("abc_123").is_ok());
        assert!(validate_job_id("").is_err());
        assert!(validate_job_id("../../status/heartbeat").is_err());
        assert!(validate_job_id("abc?x=1").is_err());
        assert!(validate_job_id("abc%2F").is_err());
    }

    #[test]
    fn test_job_url() {
        let client = HordeClient::new("http://localhost/", "test:1:me");
        assert_eq!(
            client.job_url("/api/v2/generate/check", "abc123").unwrap(),
            "http://localhost/api/v2/generate/check/abc123"
        );
        assert!(client.job_url("/api/v2/generate/check", "a/b").is_err());
    }

    #[test]
    fn test_with_api_key() {
        let client = HordeClient::new("http://localhost", "test:1:me").with_api_key("secret");
        assert_eq!(client.api_key, "secret");
    }
}
