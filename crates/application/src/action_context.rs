use std::sync::Arc;

use crate::integration_ports::IntegrationStateStore;

/// Deployment settings shared by every action invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Cloud project hosting the events topic.
    pub gcp_project_id: String,
    /// Topic receiving lifecycle telemetry.
    pub integration_events_topic: String,
}

impl RuntimeSettings {
    /// Returns the fully qualified events topic, `projects/{project}/topics/{topic}`.
    #[must_use]
    pub fn topic_path(&self) -> String {
        format!(
            "projects/{}/topics/{}",
            self.gcp_project_id, self.integration_events_topic
        )
    }
}

/// Collaborators built once at startup and handed to actions.
#[derive(Clone)]
pub struct ActionContext {
    settings: RuntimeSettings,
    state_store: Arc<dyn IntegrationStateStore>,
}

impl ActionContext {
    /// Creates an action context.
    #[must_use]
    pub fn new(settings: RuntimeSettings, state_store: Arc<dyn IntegrationStateStore>) -> Self {
        Self {
            settings,
            state_store,
        }
    }

    /// Returns runtime settings.
    #[must_use]
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Returns the checkpoint store.
    #[must_use]
    pub fn state_store(&self) -> Arc<dyn IntegrationStateStore> {
        Arc::clone(&self.state_store)
    }
}
