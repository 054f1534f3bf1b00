//! Redis-backed integration checkpoint store.

use async_trait::async_trait;
use pullbridge_application::{IntegrationStateKey, IntegrationStateStore};
use pullbridge_core::{AppError, AppResult};
use redis::AsyncCommands;
use serde_json::Value;

/// Redis implementation of the integration state port. States are stored as JSON strings.
#[derive(Clone)]
pub struct RedisIntegrationStateStore {
    client: redis::Client,
}

impl RedisIntegrationStateStore {
    /// Creates a store with a configured Redis client.
    #[must_use]
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Transport(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl IntegrationStateStore for RedisIntegrationStateStore {
    async fn get_state(&self, key: &IntegrationStateKey) -> AppResult<Option<Value>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> = connection.get(key.to_string()).await.map_err(|error| {
            AppError::Transport(format!("failed to read integration state '{key}': {error}"))
        })?;

        encoded.as_deref().map(|value| decode_state(key, value)).transpose()
    }

    async fn set_state(&self, key: &IntegrationStateKey, state: Value) -> AppResult<()> {
        let mut connection = self.connection().await?;

        connection
            .set(key.to_string(), state.to_string())
            .await
            .map_err(|error| {
                AppError::Transport(format!("failed to write integration state '{key}': {error}"))
            })
    }
}

fn decode_state(key: &IntegrationStateKey, value: &str) -> AppResult<Value> {
    serde_json::from_str(value).map_err(|error| {
        AppError::Internal(format!(
            "invalid integration state stored under '{key}': {error}"
        ))
    })
}
