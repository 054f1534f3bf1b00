//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod action;
mod event;
mod filter;
mod integration;

pub use action::{
    ActionConfiguration, ActionResult, AuthType, AuthenticateConfig, GenericPullConfig,
    OutputType, PULL_DATA_ACTION_ID,
};
pub use event::{
    ActionExecutionComplete, ActionExecutionFailed, ActionExecutionStarted, CustomActivityLog,
    LifecycleEvent, LogLevel, SystemEvent,
};
pub use filter::{FilterExpression, normalize_filter};
pub use integration::{
    AUTH_ACTION_ID, Integration, IntegrationActionConfiguration, find_config_for_action,
};
