use std::sync::Arc;

use pullbridge_core::{AppError, AppResult};
use pullbridge_domain::{AuthType, GenericPullConfig, Integration};
use serde_json::Value;
use tracing::debug;

use crate::integration_ports::{TokenAuthenticator, TrackingDataSource};
use crate::retry_policy::RetryPolicy;

/// Authenticates against a provider and downloads one batch of raw records.
#[derive(Clone)]
pub struct DataPuller {
    authenticator: Arc<dyn TokenAuthenticator>,
    data_source: Arc<dyn TrackingDataSource>,
    retry_policy: RetryPolicy,
}

impl DataPuller {
    /// Creates a puller using the default data pull retry policy.
    #[must_use]
    pub fn new(
        authenticator: Arc<dyn TokenAuthenticator>,
        data_source: Arc<dyn TrackingDataSource>,
    ) -> Self {
        Self {
            authenticator,
            data_source,
            retry_policy: RetryPolicy::data_pull(),
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Pulls the records served at the configured URL.
    ///
    /// Authentication and download are retried together on transport errors,
    /// so every attempt uses a freshly issued token.
    pub async fn pull(
        &self,
        integration: &Integration,
        config: &GenericPullConfig,
    ) -> AppResult<Vec<Value>> {
        self.retry_policy
            .run("pull_data", || self.pull_once(integration, config))
            .await
    }

    async fn pull_once(
        &self,
        integration: &Integration,
        config: &GenericPullConfig,
    ) -> AppResult<Vec<Value>> {
        let auth_config = integration.auth_config()?;

        let body = match auth_config.auth_type()? {
            AuthType::UsernamePassword => {
                let token = self.authenticator.authenticate(&auth_config).await?;
                self.data_source
                    .fetch(config.url.as_str(), token.as_str())
                    .await?
            }
        };

        let records = records_from_body(body)?;
        debug!(
            integration_id = %integration.id(),
            records = records.len(),
            "pulled provider records"
        );

        Ok(records)
    }
}

fn records_from_body(body: Value) -> AppResult<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(_) => Ok(vec![body]),
        other => Err(AppError::Validation(format!(
            "provider response must be a JSON array or object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests;
