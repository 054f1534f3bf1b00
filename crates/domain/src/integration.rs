use pullbridge_core::{AppError, AppResult, IntegrationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{ActionConfiguration, AuthenticateConfig};

/// Action id under which an integration stores its provider credentials.
pub const AUTH_ACTION_ID: &str = "auth";

/// One raw configuration record attached to an integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationActionConfiguration {
    /// Action the record configures, e.g. `auth` or `pull_data`.
    pub action_id: String,
    /// Untyped configuration payload.
    #[serde(default)]
    pub data: Value,
}

/// Connected third-party data source and its configuration records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    id: IntegrationId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    configurations: Vec<IntegrationActionConfiguration>,
}

impl Integration {
    /// Creates an integration from its identity and configuration records.
    #[must_use]
    pub fn new(
        id: IntegrationId,
        name: impl Into<String>,
        base_url: Option<String>,
        configurations: Vec<IntegrationActionConfiguration>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            base_url,
            configurations,
        }
    }

    /// Returns the integration identifier.
    #[must_use]
    pub fn id(&self) -> IntegrationId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the provider base URL, if configured.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Returns all configuration records.
    #[must_use]
    pub fn configurations(&self) -> &[IntegrationActionConfiguration] {
        self.configurations.as_slice()
    }

    /// Resolves and parses the typed configuration for one action.
    pub fn action_config(&self, action_id: &str) -> AppResult<ActionConfiguration> {
        let record = find_config_for_action(&self.configurations, action_id).ok_or_else(|| {
            AppError::Configuration(format!(
                "integration '{}' has no configuration for action '{action_id}'",
                self.id
            ))
        })?;

        ActionConfiguration::parse(record.action_id.as_str(), &record.data)
    }

    /// Resolves the credentials stored under the `auth` action.
    pub fn auth_config(&self) -> AppResult<AuthenticateConfig> {
        match self.action_config(AUTH_ACTION_ID)? {
            ActionConfiguration::Authenticate(config) => Ok(config),
            other => Err(AppError::Configuration(format!(
                "configuration for action '{AUTH_ACTION_ID}' resolved to action '{}'",
                other.action_id()
            ))),
        }
    }
}

/// Finds the configuration record for an action id.
#[must_use]
pub fn find_config_for_action<'a>(
    configurations: &'a [IntegrationActionConfiguration],
    action_id: &str,
) -> Option<&'a IntegrationActionConfiguration> {
    configurations
        .iter()
        .find(|configuration| configuration.action_id == action_id)
}
