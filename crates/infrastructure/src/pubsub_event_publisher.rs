//! Google Cloud Pub/Sub REST publisher.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use pullbridge_application::EventPublisher;
use pullbridge_core::AppResult;
use serde_json::json;
use tracing::debug;

use crate::http_response::{ensure_success, transport_error};

const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes messages through the Pub/Sub `topics.publish` REST method.
#[derive(Clone)]
pub struct PubSubEventPublisher {
    http_client: reqwest::Client,
    base_url: String,
    project_id: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl PubSubEventPublisher {
    /// Creates a publisher for one project. `base_url` may point at the emulator.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            project_id: project_id.into(),
            access_token: None,
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Authenticates requests with an OAuth access token.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Overrides the 10 second publish timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn publish_url(&self, topic: &str) -> String {
        format!(
            "{}/v1/projects/{}/topics/{topic}:publish",
            self.base_url, self.project_id
        )
    }
}

#[async_trait]
impl EventPublisher for PubSubEventPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> AppResult<()> {
        let url = self.publish_url(topic);
        let mut request = self
            .http_client
            .post(url.as_str())
            .timeout(self.timeout)
            .json(&json!({
                "messages": [{"data": general_purpose::STANDARD.encode(payload)}],
            }));
        if let Some(access_token) = &self.access_token {
            request = request.bearer_auth(access_token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| transport_error("pubsub publish", &error))?;
        ensure_success(response)?;

        debug!(topic, bytes = payload.len(), "pubsub message published");
        Ok(())
    }
}
