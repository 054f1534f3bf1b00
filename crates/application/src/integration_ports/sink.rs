use async_trait::async_trait;
use pullbridge_core::{AppResult, IntegrationId};
use serde_json::Value;

/// Downstream aggregation service receiving transformed records.
#[async_trait]
pub trait AggregationSink: Send + Sync {
    /// Sends positional observations and returns one acknowledgement per accepted record.
    async fn send_observations(
        &self,
        observations: Vec<Value>,
        integration_id: IntegrationId,
    ) -> AppResult<Vec<Value>>;

    /// Sends discrete events and returns one acknowledgement per accepted record.
    async fn send_events(
        &self,
        events: Vec<Value>,
        integration_id: IntegrationId,
    ) -> AppResult<Vec<Value>>;
}
