use async_trait::async_trait;
use pullbridge_core::AppResult;

/// Message topic carrying integration telemetry.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one serialized message to a topic.
    async fn publish(&self, topic: &str, payload: &[u8]) -> AppResult<()>;
}
