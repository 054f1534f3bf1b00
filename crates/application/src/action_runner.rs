use pullbridge_core::{AppError, AppResult};
use pullbridge_domain::{ActionConfiguration, ActionResult, Integration};
use tracing::info;

use crate::pull_data_action::PullDataAction;

/// Routes an action request to its handler.
#[derive(Clone)]
pub struct ActionRunner {
    pull_data: PullDataAction,
}

impl ActionRunner {
    /// Creates the runner.
    #[must_use]
    pub fn new(pull_data: PullDataAction) -> Self {
        Self { pull_data }
    }

    /// Resolves the integration's configuration for `action_id` and executes it.
    pub async fn execute_action(
        &self,
        integration: &Integration,
        action_id: &str,
    ) -> AppResult<ActionResult> {
        info!(integration_id = %integration.id(), action_id, "executing action");

        match integration.action_config(action_id)? {
            ActionConfiguration::PullData(config) => {
                self.pull_data.execute(integration, &config).await
            }
            other => Err(AppError::Configuration(format!(
                "action '{}' is not executable",
                other.action_id()
            ))),
        }
    }
}
