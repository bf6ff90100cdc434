//! Service heartbeat endpoint

use crate::HordeClient;
use crate::error::Result;

impl HordeClient {
    /// Check that the Horde API is reachable and healthy
    ///
    /// Used to drive the "Horde online" indicator. Any non-2xx answer is an error.
    pub async fn heartbeat(&self) -> Result<()> {
        let url = format!("{}/api/v2/status/heartbeat", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    use crate::{ClientError, HordeClient, test_server};

    #[tokio::test]
    async fn test_heartbeat_ok() {
        let app = Router::new().route("/api/v2/status/heartbeat", get(|| async { "OK" }));
        let addr = test_server::spawn(app).await;
        let client = HordeClient::new(format!("http://{}", addr), "test:1:me");
        assert!(client.heartbeat().await.is_ok());
    }

    #[tokio::test]
    async fn test_heartbeat_maintenance() {
        let app = Router::new().route(
            "/api/v2/status/heartbeat",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let addr = test_server::spawn(app).await;
        let client = HordeClient::new(format!("http://{}", addr), "test:1:me");
        let err = client.heartbeat().await.unwrap_err();
        assert!(matches!(err, ClientError::ApiError { status: 503, .. }));
    }
}
