use std::time::Duration;

use async_trait::async_trait;
use pullbridge_application::TokenAuthenticator;
use pullbridge_core::{AppError, AppResult};
use pullbridge_domain::AuthenticateConfig;
use serde_json::{Value, json};
use tracing::debug;

use crate::http_response::{ensure_success, read_json, transport_error};

const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Username/password token exchange over HTTP.
#[derive(Clone)]
pub struct HttpTokenAuthenticator {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpTokenAuthenticator {
    /// Creates an authenticator with the default 120 second request timeout.
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TokenAuthenticator for HttpTokenAuthenticator {
    async fn authenticate(&self, auth_config: &AuthenticateConfig) -> AppResult<String> {
        debug!(auth_url = auth_config.auth_url.as_str(), "requesting provider token");

        let response = self
            .http_client
            .post(auth_config.auth_url.as_str())
            .timeout(self.timeout)
            .json(&json!({
                "username": auth_config.username,
                "password": auth_config.password,
            }))
            .send()
            .await
            .map_err(|error| transport_error("token request", &error))?;
        let response = ensure_success(response)?;
        let body = read_json(response, "token endpoint", AppError::FieldExtraction).await?;

        body.get(auth_config.token_field.as_str())
            .and_then(token_text)
            .ok_or_else(|| {
                AppError::FieldExtraction(format!(
                    "token endpoint response has no usable field '{}'",
                    auth_config.token_field
                ))
            })
    }
}

// Scalar tokens are sent as their text; null and structured values are not tokens.
fn token_text(value: &Value) -> Option<String> {
    match value {
        Value::String(token) => Some(token.clone()),
        Value::Number(token) => Some(token.to_string()),
        Value::Bool(token) => Some(token.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
