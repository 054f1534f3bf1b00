use std::collections::HashMap;

use async_trait::async_trait;
use pullbridge_application::{IntegrationStateKey, IntegrationStateStore};
use pullbridge_core::AppResult;
use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory checkpoint store for local runs and tests.
#[derive(Default)]
pub struct InMemoryIntegrationStateStore {
    states: RwLock<HashMap<IntegrationStateKey, Value>>,
}

impl InMemoryIntegrationStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntegrationStateStore for InMemoryIntegrationStateStore {
    async fn get_state(&self, key: &IntegrationStateKey) -> AppResult<Option<Value>> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn set_state(&self, key: &IntegrationStateKey, state: Value) -> AppResult<()> {
        self.states.write().await.insert(key.clone(), state);
        Ok(())
    }
}
