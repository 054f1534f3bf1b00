//! Application services and ports.

#![forbid(unsafe_code)]

mod action_context;
mod action_runner;
mod activity_logger;
mod data_puller;
mod integration_ports;
mod pull_data_action;
mod retry_policy;
mod transform_service;

#[cfg(test)]
mod test_support;

pub use action_context::{ActionContext, RuntimeSettings};
pub use action_runner::ActionRunner;
pub use activity_logger::{ActivityLogger, TelemetryOptions};
pub use data_puller::DataPuller;
pub use integration_ports::{
    AggregationSink, EventPublisher, IntegrationStateKey, IntegrationStateStore,
    TokenAuthenticator, TrackingDataSource,
};
pub use pull_data_action::PullDataAction;
pub use retry_policy::RetryPolicy;
pub use transform_service::transform_records;
