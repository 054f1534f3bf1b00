use std::time::Duration;

use async_trait::async_trait;
use pullbridge_application::TrackingDataSource;
use pullbridge_core::{AppError, AppResult};
use serde_json::Value;
use tracing::debug;

use crate::http_response::{ensure_success, read_json, transport_error};

/// Bearer-authenticated JSON download from a provider.
#[derive(Clone)]
pub struct HttpTrackingDataSource {
    http_client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpTrackingDataSource {
    /// Creates a data source relying on the client's own timeouts.
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            timeout: None,
        }
    }

    /// Sets an explicit per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl TrackingDataSource for HttpTrackingDataSource {
    async fn fetch(&self, url: &str, bearer_token: &str) -> AppResult<Value> {
        debug!(url, "downloading provider data");

        let mut request = self.http_client.get(url).bearer_auth(bearer_token);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|error| transport_error("data request", &error))?;
        let response = ensure_success(response)?;

        read_json(response, "provider data endpoint", AppError::Validation).await
    }
}
