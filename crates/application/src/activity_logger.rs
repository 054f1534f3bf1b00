use std::future::Future;
use std::sync::Arc;

use pullbridge_core::{AppResult, IntegrationId};
use pullbridge_domain::{
    ActionExecutionComplete, ActionExecutionFailed, ActionExecutionStarted, CustomActivityLog,
    LifecycleEvent, LogLevel, SystemEvent,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::action_context::ActionContext;
use crate::integration_ports::EventPublisher;
use crate::retry_policy::RetryPolicy;

/// Selects which lifecycle events are published around an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryOptions {
    /// Publish a started event before the action runs.
    pub on_start: bool,
    /// Publish a complete event after success.
    pub on_completion: bool,
    /// Publish a failed event after an error.
    pub on_error: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            on_start: true,
            on_completion: true,
            on_error: true,
        }
    }
}

/// Publishes integration activity to the events topic.
#[derive(Clone)]
pub struct ActivityLogger {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
    topic_path: String,
    retry_policy: RetryPolicy,
}

impl ActivityLogger {
    /// Creates an activity logger targeting the configured events topic.
    #[must_use]
    pub fn new(context: &ActionContext, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher,
            topic: context.settings().integration_events_topic.clone(),
            topic_path: context.settings().topic_path(),
            retry_policy: RetryPolicy::event_publish(),
        }
    }

    /// Overrides the publish retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Returns the events topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.topic.as_str()
    }

    /// Returns the events topic qualified with its project.
    #[must_use]
    pub fn topic_path(&self) -> &str {
        self.topic_path.as_str()
    }

    /// Serializes and publishes one lifecycle event.
    pub async fn publish_event(&self, event: LifecycleEvent) -> AppResult<()> {
        let envelope = SystemEvent::new(event);
        let payload = envelope.to_json_bytes()?;

        debug!(
            topic = self.topic_path.as_str(),
            event_id = %envelope.event_id(),
            event_type = envelope.event().event_type(),
            integration_id = %envelope.event().integration_id(),
            action_id = envelope.event().action_id(),
            "publishing activity event"
        );

        self.retry_policy
            .run("publish_event", || {
                self.publisher
                    .publish(self.topic.as_str(), payload.as_slice())
            })
            .await?;

        debug!(event_id = %envelope.event_id(), "activity event published");
        Ok(())
    }

    /// Publishes a free-form activity log entry.
    pub async fn log_activity(
        &self,
        integration_id: IntegrationId,
        action_id: &str,
        title: impl Into<String>,
        level: LogLevel,
        config_data: Option<Value>,
        data: Option<Value>,
    ) -> AppResult<()> {
        let title = title.into();
        info!(
            %integration_id,
            action_id,
            level = ?level,
            title = title.as_str(),
            "custom activity log"
        );

        self.publish_event(LifecycleEvent::IntegrationActionCustomLog(
            CustomActivityLog {
                integration_id,
                action_id: action_id.to_owned(),
                config_data,
                title,
                level,
                data,
            },
        ))
        .await
    }

    /// Runs an action between started and complete/failed events.
    ///
    /// A failed started event is returned and the action never runs. An
    /// action error is returned unchanged even when its failed event cannot be
    /// published.
    pub async fn run_with_telemetry<T, F, Fut>(
        &self,
        options: TelemetryOptions,
        integration_id: IntegrationId,
        action_id: &str,
        config_data: Option<Value>,
        action: F,
    ) -> AppResult<T>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if options.on_start {
            self.publish_event(LifecycleEvent::IntegrationActionStarted(
                ActionExecutionStarted {
                    integration_id,
                    action_id: action_id.to_owned(),
                    config_data: config_data.clone(),
                },
            ))
            .await?;
        }

        match action().await {
            Ok(result) => {
                if options.on_completion {
                    let result_value = serde_json::to_value(&result).unwrap_or_else(|error| {
                        warn!(%integration_id, action_id, %error, "action result is not serializable");
                        Value::Null
                    });
                    self.publish_event(LifecycleEvent::IntegrationActionComplete(
                        ActionExecutionComplete {
                            integration_id,
                            action_id: action_id.to_owned(),
                            config_data,
                            result: result_value,
                        },
                    ))
                    .await?;
                }

                Ok(result)
            }
            Err(action_error) => {
                if options.on_error {
                    let published = self
                        .publish_event(LifecycleEvent::IntegrationActionFailed(
                            ActionExecutionFailed {
                                integration_id,
                                action_id: action_id.to_owned(),
                                config_data,
                                error: action_error.to_string(),
                            },
                        ))
                        .await;

                    if let Err(publish_error) = published {
                        error!(
                            %integration_id,
                            action_id,
                            %action_error,
                            %publish_error,
                            "failed to publish action failure event"
                        );
                    }
                }

                Err(action_error)
            }
        }
    }
}
