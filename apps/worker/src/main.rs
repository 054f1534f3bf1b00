//! Pullbridge integration worker runtime.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use pullbridge_application::{
    ActionContext, ActionRunner, ActivityLogger, DataPuller, EventPublisher,
    IntegrationStateStore, PullDataAction, RuntimeSettings,
};
use pullbridge_core::{AppError, AppResult};
use pullbridge_domain::{Integration, PULL_DATA_ACTION_ID};
use pullbridge_infrastructure::{
    ConsoleEventPublisher, HttpAggregationSink, HttpTokenAuthenticator, HttpTrackingDataSource,
    InMemoryIntegrationStateStore, PubSubEventPublisher, RedisIntegrationStateStore,
};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventPublisherKind {
    PubSub,
    Console,
}

impl EventPublisherKind {
    fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pubsub" => Ok(Self::PubSub),
            "console" => Ok(Self::Console),
            _ => Err(AppError::Validation(format!(
                "invalid EVENT_PUBLISHER value '{value}'. Expected 'pubsub' or 'console'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct WorkerConfig {
    gcp_project_id: String,
    integration_events_topic: String,
    event_publisher: EventPublisherKind,
    pubsub_api_base_url: String,
    pubsub_access_token: Option<String>,
    gundi_api_base_url: String,
    gundi_api_token: String,
    redis_url: Option<String>,
    pull_timeout_seconds: Option<u64>,
    job_file: String,
}

#[derive(Debug, Deserialize)]
struct ActionJob {
    integration: Integration,
    #[serde(default = "default_action_id")]
    action_id: String,
}

fn default_action_id() -> String {
    PULL_DATA_ACTION_ID.to_owned()
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let job = load_job(config.job_file.as_str())?;
    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let runner = build_action_runner(&config, http_client)?;

    info!(
        integration_id = %job.integration.id(),
        integration_name = job.integration.name(),
        action_id = job.action_id.as_str(),
        events_topic = config.integration_events_topic.as_str(),
        "pullbridge-worker started"
    );

    let result = runner
        .execute_action(&job.integration, job.action_id.as_str())
        .await?;

    info!(
        integration_id = %job.integration.id(),
        action_id = job.action_id.as_str(),
        data_points_qty = result.data_points_qty,
        "action completed"
    );

    Ok(())
}

fn build_action_runner(
    config: &WorkerConfig,
    http_client: reqwest::Client,
) -> AppResult<ActionRunner> {
    let context = ActionContext::new(
        RuntimeSettings {
            gcp_project_id: config.gcp_project_id.clone(),
            integration_events_topic: config.integration_events_topic.clone(),
        },
        build_state_store(config)?,
    );

    let mut data_source = HttpTrackingDataSource::new(http_client.clone());
    if let Some(seconds) = config.pull_timeout_seconds {
        data_source = data_source.with_timeout(Duration::from_secs(seconds));
    }
    let puller = DataPuller::new(
        Arc::new(HttpTokenAuthenticator::new(http_client.clone())),
        Arc::new(data_source),
    );
    let sink = Arc::new(HttpAggregationSink::new(
        http_client.clone(),
        config.gundi_api_base_url.as_str(),
        config.gundi_api_token.as_str(),
    ));
    let event_publisher = build_event_publisher(config, context.settings(), http_client);
    let activity_logger = ActivityLogger::new(&context, event_publisher);

    Ok(ActionRunner::new(PullDataAction::new(
        context,
        puller,
        sink,
        activity_logger,
    )))
}

fn build_event_publisher(
    config: &WorkerConfig,
    settings: &RuntimeSettings,
    http_client: reqwest::Client,
) -> Arc<dyn EventPublisher> {
    match config.event_publisher {
        EventPublisherKind::Console => Arc::new(ConsoleEventPublisher::new()),
        EventPublisherKind::PubSub => {
            let mut publisher = PubSubEventPublisher::new(
                http_client,
                config.pubsub_api_base_url.as_str(),
                settings.gcp_project_id.as_str(),
            );
            if let Some(access_token) = &config.pubsub_access_token {
                publisher = publisher.with_access_token(access_token.as_str());
            }
            Arc::new(publisher)
        }
    }
}

fn build_state_store(config: &WorkerConfig) -> AppResult<Arc<dyn IntegrationStateStore>> {
    match &config.redis_url {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL '{redis_url}': {error}"))
            })?;
            Ok(Arc::new(RedisIntegrationStateStore::new(client)))
        }
        None => {
            info!("REDIS_URL not set, integration state is kept in memory");
            Ok(Arc::new(InMemoryIntegrationStateStore::new()))
        }
    }
}

fn load_job(path: &str) -> AppResult<ActionJob> {
    let contents = std::fs::read_to_string(path).map_err(|error| {
        AppError::Validation(format!("failed to read WORKER_JOB_FILE '{path}': {error}"))
    })?;

    parse_job(contents.as_str())
}

fn parse_job(contents: &str) -> AppResult<ActionJob> {
    serde_json::from_str(contents)
        .map_err(|error| AppError::Validation(format!("invalid action job: {error}")))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let gcp_project_id = required_env("GCP_PROJECT_ID")?;
        let integration_events_topic =
            optional_env("INTEGRATION_EVENTS_TOPIC").unwrap_or_else(|| "integration-events".to_owned());
        let event_publisher = optional_env("EVENT_PUBLISHER")
            .map(|value| EventPublisherKind::parse(value.as_str()))
            .transpose()?
            .unwrap_or(EventPublisherKind::PubSub);
        let pubsub_api_base_url = optional_env("PUBSUB_API_BASE_URL")
            .unwrap_or_else(|| "https://pubsub.googleapis.com".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let pubsub_access_token = optional_env("PUBSUB_ACCESS_TOKEN");
        let gundi_api_base_url = required_env("GUNDI_API_BASE_URL")?
            .trim_end_matches('/')
            .to_owned();
        let gundi_api_token = required_env("GUNDI_API_TOKEN")?;
        let redis_url = optional_env("REDIS_URL");
        let pull_timeout_seconds = optional_env("PULL_TIMEOUT_SECONDS")
            .map(|value| parse_seconds("PULL_TIMEOUT_SECONDS", value.as_str()))
            .transpose()?;
        let job_file = required_env("WORKER_JOB_FILE")?;

        Ok(Self {
            gcp_project_id,
            integration_events_topic,
            event_publisher,
            pubsub_api_base_url,
            pubsub_access_token,
            gundi_api_base_url,
            gundi_api_token,
            redis_url,
            pull_timeout_seconds,
            job_file,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    optional_env(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_seconds(name: &str, value: &str) -> AppResult<u64> {
    let seconds = value.parse::<u64>().map_err(|error| {
        AppError::Validation(format!("invalid {name} value '{value}': {error}"))
    })?;

    if seconds == 0 {
        return Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use pullbridge_core::AppError;

    use super::{EventPublisherKind, parse_job, parse_seconds};

    #[test]
    fn job_defaults_to_pull_data() {
        let job = parse_job(
            r#"{
                "integration": {
                    "id": "6f1ac0f4-8d0c-4b7e-9a3b-1f4b5d8e2c11",
                    "name": "Savannah Collars",
                    "configurations": []
                }
            }"#,
        );

        assert!(job.is_ok());
        let job = job.unwrap_or_else(|_| unreachable!());
        assert_eq!(job.action_id, "pull_data");
        assert_eq!(job.integration.name(), "Savannah Collars");
    }

    #[test]
    fn job_without_integration_is_rejected() {
        assert!(matches!(
            parse_job(r#"{"action_id": "pull_data"}"#),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn event_publisher_kind_is_case_insensitive() {
        assert!(matches!(
            EventPublisherKind::parse("Console"),
            Ok(EventPublisherKind::Console)
        ));
        assert!(matches!(
            EventPublisherKind::parse("pubsub"),
            Ok(EventPublisherKind::PubSub)
        ));
        assert!(EventPublisherKind::parse("kafka").is_err());
    }

    #[test]
    fn timeouts_must_be_positive_integers() {
        assert_eq!(parse_seconds("PULL_TIMEOUT_SECONDS", "30").unwrap_or_default(), 30);
        assert!(parse_seconds("PULL_TIMEOUT_SECONDS", "0").is_err());
        assert!(parse_seconds("PULL_TIMEOUT_SECONDS", "soon").is_err());
    }
}
