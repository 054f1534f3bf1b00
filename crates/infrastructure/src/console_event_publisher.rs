//! Console event publisher for local runs. Logs messages to tracing output.

use async_trait::async_trait;
use pullbridge_application::EventPublisher;
use pullbridge_core::AppResult;
use tracing::info;

/// Development publisher that logs events instead of sending them.
#[derive(Clone, Default)]
pub struct ConsoleEventPublisher;

impl ConsoleEventPublisher {
    /// Creates a new console event publisher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for ConsoleEventPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> AppResult<()> {
        info!(
            topic,
            "--- EVENT (console) ---\n{}\n--- END EVENT ---",
            String::from_utf8_lossy(payload)
        );

        Ok(())
    }
}
