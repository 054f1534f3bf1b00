use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use pullbridge_core::{AppError, AppResult, IntegrationId};
use pullbridge_domain::{AuthenticateConfig, Integration, IntegrationActionConfiguration};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::action_context::{ActionContext, RuntimeSettings};
use crate::integration_ports::{
    AggregationSink, EventPublisher, IntegrationStateKey, IntegrationStateStore,
    TokenAuthenticator, TrackingDataSource,
};

pub(crate) const EVENTS_TOPIC: &str = "integration-events-test";

pub(crate) fn integration(auth_type: &str, output_type: &str) -> Integration {
    Integration::new(
        IntegrationId::new(),
        "Savannah Collars",
        None,
        vec![
            IntegrationActionConfiguration {
                action_id: "auth".to_owned(),
                data: json!({
                    "auth_type": auth_type,
                    "auth_url": "https://provider.test/login",
                    "username": "ranger",
                    "password": "secret",
                    "token_field": "access_token",
                }),
            },
            IntegrationActionConfiguration {
                action_id: "pull_data".to_owned(),
                data: json!({
                    "url": "https://provider.test/positions",
                    "jq_filter": ".[] | select(.a > 1)",
                    "output_type": output_type,
                }),
            },
        ],
    )
}

pub(crate) fn context(state_store: Arc<FakeStateStore>) -> ActionContext {
    ActionContext::new(
        RuntimeSettings {
            gcp_project_id: "test-project".to_owned(),
            integration_events_topic: EVENTS_TOPIC.to_owned(),
        },
        state_store,
    )
}

pub(crate) struct FakeAuthenticator {
    token: String,
    failures: Mutex<VecDeque<AppError>>,
    pub(crate) calls: Mutex<Vec<AuthenticateConfig>>,
}

impl FakeAuthenticator {
    pub(crate) fn issuing(token: &str) -> Self {
        Self {
            token: token.to_owned(),
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_with(self, failures: Vec<AppError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            ..self
        }
    }
}

#[async_trait]
impl TokenAuthenticator for FakeAuthenticator {
    async fn authenticate(&self, auth_config: &AuthenticateConfig) -> AppResult<String> {
        self.calls.lock().await.push(auth_config.clone());
        match self.failures.lock().await.pop_front() {
            Some(error) => Err(error),
            None => Ok(self.token.clone()),
        }
    }
}

pub(crate) struct FakeDataSource {
    responses: Mutex<VecDeque<AppResult<Value>>>,
    fallback: Option<Value>,
    pub(crate) requests: Mutex<Vec<(String, String)>>,
    pub(crate) request_times: Mutex<Vec<Instant>>,
}

impl FakeDataSource {
    pub(crate) fn serving(body: Value) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(body),
            requests: Mutex::new(Vec::new()),
            request_times: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn unreachable_provider() -> Self {
        Self {
            fallback: None,
            ..Self::serving(Value::Null)
        }
    }

    pub(crate) fn after(self, responses: Vec<AppResult<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..self
        }
    }

    pub(crate) async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl TrackingDataSource for FakeDataSource {
    async fn fetch(&self, url: &str, bearer_token: &str) -> AppResult<Value> {
        self.requests
            .lock()
            .await
            .push((url.to_owned(), bearer_token.to_owned()));
        self.request_times.lock().await.push(Instant::now());

        if let Some(response) = self.responses.lock().await.pop_front() {
            return response;
        }

        self.fallback
            .clone()
            .ok_or_else(|| AppError::Transport(format!("connection refused: {url}")))
    }
}

#[derive(Default)]
pub(crate) struct FakeSink {
    pub(crate) observations: Mutex<Vec<(IntegrationId, Vec<Value>)>>,
    pub(crate) events: Mutex<Vec<(IntegrationId, Vec<Value>)>>,
}

fn acknowledge(records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .enumerate()
        .map(|(index, _)| json!({"object_id": format!("ack-{index}")}))
        .collect()
}

#[async_trait]
impl AggregationSink for FakeSink {
    async fn send_observations(
        &self,
        observations: Vec<Value>,
        integration_id: IntegrationId,
    ) -> AppResult<Vec<Value>> {
        let acknowledgements = acknowledge(&observations);
        self.observations
            .lock()
            .await
            .push((integration_id, observations));
        Ok(acknowledgements)
    }

    async fn send_events(
        &self,
        events: Vec<Value>,
        integration_id: IntegrationId,
    ) -> AppResult<Vec<Value>> {
        let acknowledgements = acknowledge(&events);
        self.events.lock().await.push((integration_id, events));
        Ok(acknowledgements)
    }
}

#[derive(Default)]
pub(crate) struct FakePublisher {
    failing_event_types: Vec<&'static str>,
    transient_failures: Mutex<usize>,
    pub(crate) attempts: Mutex<usize>,
    pub(crate) published: Mutex<Vec<(String, Value)>>,
}

impl FakePublisher {
    /// Every publish of these event types fails with a transport error.
    pub(crate) fn rejecting(event_types: Vec<&'static str>) -> Self {
        Self {
            failing_event_types: event_types,
            ..Self::default()
        }
    }

    /// The first `count` publish attempts fail with a transport error.
    pub(crate) fn flaky(count: usize) -> Self {
        Self {
            transient_failures: Mutex::new(count),
            ..Self::default()
        }
    }

    pub(crate) async fn event_types(&self) -> Vec<String> {
        self.published
            .lock()
            .await
            .iter()
            .map(|(_, event)| event["event_type"].as_str().unwrap_or_default().to_owned())
            .collect()
    }

    pub(crate) async fn events(&self) -> Vec<Value> {
        self.published
            .lock()
            .await
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for FakePublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> AppResult<()> {
        *self.attempts.lock().await += 1;

        let event: Value = serde_json::from_slice(payload)
            .map_err(|error| AppError::Internal(format!("payload is not json: {error}")))?;
        let event_type = event["event_type"].as_str().unwrap_or_default();
        if self
            .failing_event_types
            .iter()
            .any(|failing| *failing == event_type)
        {
            return Err(AppError::Transport("publish timed out".to_owned()));
        }

        let mut transient_failures = self.transient_failures.lock().await;
        if *transient_failures > 0 {
            *transient_failures -= 1;
            return Err(AppError::Transport("publish timed out".to_owned()));
        }
        drop(transient_failures);

        self.published.lock().await.push((topic.to_owned(), event));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeStateStore {
    pub(crate) states: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl IntegrationStateStore for FakeStateStore {
    async fn get_state(&self, key: &IntegrationStateKey) -> AppResult<Option<Value>> {
        Ok(self.states.lock().await.get(&key.to_string()).cloned())
    }

    async fn set_state(&self, key: &IntegrationStateKey, state: Value) -> AppResult<()> {
        self.states.lock().await.insert(key.to_string(), state);
        Ok(())
    }
}
