use std::sync::Arc;

use chrono::Utc;
use pullbridge_core::AppResult;
use pullbridge_domain::{
    ActionConfiguration, ActionResult, GenericPullConfig, Integration, OutputType,
    PULL_DATA_ACTION_ID,
};
use serde_json::json;
use tracing::info;

use crate::action_context::ActionContext;
use crate::activity_logger::{ActivityLogger, TelemetryOptions};
use crate::data_puller::DataPuller;
use crate::integration_ports::{AggregationSink, IntegrationStateKey};
use crate::transform_service::transform_records;

/// Pulls provider data, reshapes it and forwards it to the aggregation service.
#[derive(Clone)]
pub struct PullDataAction {
    context: ActionContext,
    puller: DataPuller,
    sink: Arc<dyn AggregationSink>,
    activity_logger: ActivityLogger,
    telemetry_options: TelemetryOptions,
}

impl PullDataAction {
    /// Creates the pull action.
    #[must_use]
    pub fn new(
        context: ActionContext,
        puller: DataPuller,
        sink: Arc<dyn AggregationSink>,
        activity_logger: ActivityLogger,
    ) -> Self {
        Self {
            context,
            puller,
            sink,
            activity_logger,
            telemetry_options: TelemetryOptions::default(),
        }
    }

    /// Overrides which lifecycle events are published.
    #[must_use]
    pub fn with_telemetry_options(mut self, telemetry_options: TelemetryOptions) -> Self {
        self.telemetry_options = telemetry_options;
        self
    }

    /// Executes one pull for an integration with lifecycle telemetry.
    pub async fn execute(
        &self,
        integration: &Integration,
        config: &GenericPullConfig,
    ) -> AppResult<ActionResult> {
        let config_data = ActionConfiguration::PullData(config.clone()).public_data();

        self.activity_logger
            .run_with_telemetry(
                self.telemetry_options,
                integration.id(),
                PULL_DATA_ACTION_ID,
                Some(config_data),
                || self.pull_transform_dispatch(integration, config),
            )
            .await
    }

    async fn pull_transform_dispatch(
        &self,
        integration: &Integration,
        config: &GenericPullConfig,
    ) -> AppResult<ActionResult> {
        let integration_id = integration.id();
        let output_type = config.output_type()?;

        info!(
            %integration_id,
            action_id = PULL_DATA_ACTION_ID,
            url = config.url.as_str(),
            "executing pull action"
        );

        let records = self.puller.pull(integration, config).await?;
        let transformed = transform_records(records, config.jq_filter.as_str())?;

        let acknowledgements = match output_type {
            OutputType::Observation => {
                self.sink
                    .send_observations(transformed, integration_id)
                    .await?
            }
            OutputType::Event => self.sink.send_events(transformed, integration_id).await?,
        };
        let data_points_qty = acknowledgements.len();

        self.context
            .state_store()
            .set_state(
                &IntegrationStateKey::new(integration_id, PULL_DATA_ACTION_ID),
                json!({
                    "last_execution": Utc::now().to_rfc3339(),
                    "data_points_qty": data_points_qty,
                }),
            )
            .await?;

        info!(
            %integration_id,
            action_id = PULL_DATA_ACTION_ID,
            output_type = output_type.as_str(),
            data_points_qty,
            "pull action finished"
        );

        Ok(ActionResult { data_points_qty })
    }
}
