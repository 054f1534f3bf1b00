use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use pullbridge_core::{AppResult, IntegrationId};
use serde_json::Value;

const DEFAULT_SOURCE_ID: &str = "no-source";

/// Address of one integration checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntegrationStateKey {
    integration_id: IntegrationId,
    action_id: String,
    source_id: String,
}

impl IntegrationStateKey {
    /// Creates a key for an action without a specific source.
    #[must_use]
    pub fn new(integration_id: IntegrationId, action_id: impl Into<String>) -> Self {
        Self {
            integration_id,
            action_id: action_id.into(),
            source_id: DEFAULT_SOURCE_ID.to_owned(),
        }
    }

    /// Narrows the key to one source, e.g. a collar or a camera trap.
    #[must_use]
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// Returns the integration identifier.
    #[must_use]
    pub fn integration_id(&self) -> IntegrationId {
        self.integration_id
    }

    /// Returns the action identifier.
    #[must_use]
    pub fn action_id(&self) -> &str {
        self.action_id.as_str()
    }

    /// Returns the source identifier.
    #[must_use]
    pub fn source_id(&self) -> &str {
        self.source_id.as_str()
    }
}

impl Display for IntegrationStateKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "integration_state.{}.{}.{}",
            self.integration_id, self.action_id, self.source_id
        )
    }
}

/// Checkpoint store shared between invocations.
#[async_trait]
pub trait IntegrationStateStore: Send + Sync {
    /// Returns the stored state, if any.
    async fn get_state(&self, key: &IntegrationStateKey) -> AppResult<Option<Value>>;

    /// Replaces the stored state.
    async fn set_state(&self, key: &IntegrationStateKey, state: Value) -> AppResult<()>;
}
