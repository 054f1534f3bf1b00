use chrono::{DateTime, Utc};
use pullbridge_core::{AppError, AppResult, IntegrationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const SCHEMA_VERSION: &str = "v1";

/// Severity of a custom activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal progress.
    Info,
    /// Degraded but recoverable.
    Warning,
    /// Failure.
    Error,
}

/// Payload published before an action runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecutionStarted {
    /// Integration the action runs for.
    pub integration_id: IntegrationId,
    /// Action identifier.
    pub action_id: String,
    /// Configuration snapshot.
    pub config_data: Option<Value>,
}

/// Payload published after an action succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecutionComplete {
    /// Integration the action ran for.
    pub integration_id: IntegrationId,
    /// Action identifier.
    pub action_id: String,
    /// Configuration snapshot.
    pub config_data: Option<Value>,
    /// Serialized action result.
    pub result: Value,
}

/// Payload published after an action failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecutionFailed {
    /// Integration the action ran for.
    pub integration_id: IntegrationId,
    /// Action identifier.
    pub action_id: String,
    /// Configuration snapshot.
    pub config_data: Option<Value>,
    /// Display form of the error that ended the action.
    pub error: String,
}

/// Free-form activity log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomActivityLog {
    /// Integration the entry belongs to.
    pub integration_id: IntegrationId,
    /// Action identifier.
    pub action_id: String,
    /// Configuration snapshot.
    pub config_data: Option<Value>,
    /// Human-readable title shown in the activity log.
    pub title: String,
    /// Entry severity.
    pub level: LogLevel,
    /// Extra structured data.
    pub data: Option<Value>,
}

/// Lifecycle telemetry of one action invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload")]
pub enum LifecycleEvent {
    /// Action is about to run.
    IntegrationActionStarted(ActionExecutionStarted),
    /// Action finished successfully.
    IntegrationActionComplete(ActionExecutionComplete),
    /// Action returned an error.
    IntegrationActionFailed(ActionExecutionFailed),
    /// Ad-hoc activity log.
    IntegrationActionCustomLog(CustomActivityLog),
}

impl LifecycleEvent {
    /// Returns the stable event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::IntegrationActionStarted(_) => "IntegrationActionStarted",
            Self::IntegrationActionComplete(_) => "IntegrationActionComplete",
            Self::IntegrationActionFailed(_) => "IntegrationActionFailed",
            Self::IntegrationActionCustomLog(_) => "IntegrationActionCustomLog",
        }
    }

    /// Returns the integration the event belongs to.
    #[must_use]
    pub fn integration_id(&self) -> IntegrationId {
        match self {
            Self::IntegrationActionStarted(payload) => payload.integration_id,
            Self::IntegrationActionComplete(payload) => payload.integration_id,
            Self::IntegrationActionFailed(payload) => payload.integration_id,
            Self::IntegrationActionCustomLog(payload) => payload.integration_id,
        }
    }

    /// Returns the action the event belongs to.
    #[must_use]
    pub fn action_id(&self) -> &str {
        match self {
            Self::IntegrationActionStarted(payload) => payload.action_id.as_str(),
            Self::IntegrationActionComplete(payload) => payload.action_id.as_str(),
            Self::IntegrationActionFailed(payload) => payload.action_id.as_str(),
            Self::IntegrationActionCustomLog(payload) => payload.action_id.as_str(),
        }
    }
}

/// Envelope put on the events topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemEvent {
    event_id: Uuid,
    timestamp: DateTime<Utc>,
    schema_version: &'static str,
    #[serde(flatten)]
    event: LifecycleEvent,
}

impl SystemEvent {
    /// Wraps a lifecycle event with a fresh id and timestamp.
    #[must_use]
    pub fn new(event: LifecycleEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            schema_version: SCHEMA_VERSION,
            event,
        }
    }

    /// Returns the event id.
    #[must_use]
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Returns the wrapped lifecycle event.
    #[must_use]
    pub fn event(&self) -> &LifecycleEvent {
        &self.event
    }

    /// Serializes the envelope to UTF-8 JSON.
    pub fn to_json_bytes(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|error| {
            AppError::Internal(format!(
                "failed to serialize {} event: {error}",
                self.event.event_type()
            ))
        })
    }
}
