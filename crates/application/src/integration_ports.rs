mod events;
mod provider;
mod sink;
mod state;

pub use events::EventPublisher;
pub use provider::{TokenAuthenticator, TrackingDataSource};
pub use sink::AggregationSink;
pub use state::{IntegrationStateKey, IntegrationStateStore};
