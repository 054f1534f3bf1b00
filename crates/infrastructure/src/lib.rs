//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_event_publisher;
mod http_aggregation_sink;
mod http_response;
mod http_token_authenticator;
mod http_tracking_data_source;
mod in_memory_integration_state_store;
mod pubsub_event_publisher;
mod redis_integration_state_store;

pub use console_event_publisher::ConsoleEventPublisher;
pub use http_aggregation_sink::HttpAggregationSink;
pub use http_token_authenticator::HttpTokenAuthenticator;
pub use http_tracking_data_source::HttpTrackingDataSource;
pub use in_memory_integration_state_store::InMemoryIntegrationStateStore;
pub use pubsub_event_publisher::PubSubEventPublisher;
pub use redis_integration_state_store::RedisIntegrationStateStore;
