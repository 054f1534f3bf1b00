use std::sync::Arc;
use std::time::Duration;

use pullbridge_core::{AppError, IntegrationId};
use pullbridge_domain::{ActionConfiguration, GenericPullConfig, Integration};
use serde_json::json;

use crate::test_support::{FakeAuthenticator, FakeDataSource, integration};

use super::DataPuller;

fn pull_config(integration: &Integration) -> GenericPullConfig {
    match integration.action_config("pull_data") {
        Ok(ActionConfiguration::PullData(config)) => config,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn token_from_authenticator_is_used_for_the_data_request() {
    let authenticator = Arc::new(FakeAuthenticator::issuing("abc123"));
    let data_source = Arc::new(FakeDataSource::serving(json!([{"a": 1}, {"a": 2}])));
    let puller = DataPuller::new(authenticator.clone(), data_source.clone());
    let integration = integration("username_password", "obv");

    let records = puller.pull(&integration, &pull_config(&integration)).await;

    assert!(records.is_ok());
    assert_eq!(records.unwrap_or_default(), vec![json!({"a": 1}), json!({"a": 2})]);
    assert_eq!(
        data_source.requests.lock().await.as_slice(),
        &[(
            "https://provider.test/positions".to_owned(),
            "abc123".to_owned()
        )]
    );
    let auth_calls = authenticator.calls.lock().await;
    assert_eq!(auth_calls.len(), 1);
    assert_eq!(auth_calls[0].token_field, "access_token");
}

#[tokio::test]
async fn object_body_is_a_single_record() {
    let puller = DataPuller::new(
        Arc::new(FakeAuthenticator::issuing("abc123")),
        Arc::new(FakeDataSource::serving(json!({"a": 5}))),
    );
    let integration = integration("username_password", "obv");

    let records = puller.pull(&integration, &pull_config(&integration)).await;
    assert_eq!(records.unwrap_or_default(), vec![json!({"a": 5})]);
}

#[tokio::test]
async fn scalar_body_is_validation_error() {
    let puller = DataPuller::new(
        Arc::new(FakeAuthenticator::issuing("abc123")),
        Arc::new(FakeDataSource::serving(json!("maintenance"))),
    );
    let integration = integration("username_password", "obv");

    let records = puller.pull(&integration, &pull_config(&integration)).await;
    assert!(matches!(records, Err(AppError::Validation(message)) if message.contains("string")));
}

#[tokio::test]
async fn unsupported_auth_type_fails_without_network_calls() {
    let authenticator = Arc::new(FakeAuthenticator::issuing("abc123"));
    let data_source = Arc::new(FakeDataSource::serving(json!([])));
    let puller = DataPuller::new(authenticator.clone(), data_source.clone());
    let integration = integration("oauth2", "obv");

    let records = puller.pull(&integration, &pull_config(&integration)).await;

    assert!(matches!(records, Err(AppError::Configuration(message)) if message.contains("oauth2")));
    assert!(authenticator.calls.lock().await.is_empty());
    assert_eq!(data_source.request_count().await, 0);
}

#[tokio::test]
async fn missing_auth_configuration_is_configuration_error() {
    let puller = DataPuller::new(
        Arc::new(FakeAuthenticator::issuing("abc123")),
        Arc::new(FakeDataSource::serving(json!([]))),
    );
    let integration = Integration::new(IntegrationId::new(), "No Auth", None, Vec::new());
    let config = GenericPullConfig {
        url: "https://provider.test/positions".to_owned(),
        jq_filter: ".[]".to_owned(),
        output_type: "obv".to_owned(),
    };

    let records = puller.pull(&integration, &config).await;
    assert!(matches!(records, Err(AppError::Configuration(message)) if message.contains("'auth'")));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_with_bounded_backoff() {
    let authenticator = Arc::new(FakeAuthenticator::issuing("abc123"));
    let data_source = Arc::new(
        FakeDataSource::serving(json!([{"a": 2}])).after(vec![
            Err(AppError::Transport("connection reset".to_owned())),
            Err(AppError::HttpStatus {
                status: 503,
                url: "https://provider.test/positions".to_owned(),
            }),
            Err(AppError::Transport("read timed out".to_owned())),
        ]),
    );
    let puller = DataPuller::new(authenticator.clone(), data_source.clone());
    let integration = integration("username_password", "obv");

    let records = puller.pull(&integration, &pull_config(&integration)).await;

    assert_eq!(records.unwrap_or_default(), vec![json!({"a": 2})]);
    assert_eq!(authenticator.calls.lock().await.len(), 4);

    let request_times = data_source.request_times.lock().await;
    assert_eq!(request_times.len(), 4);
    for pair in request_times.windows(2) {
        let wait = pair[1].duration_since(pair[0]);
        assert!(wait >= Duration::from_secs(1), "wait {wait:?} below initial backoff");
        assert!(wait <= Duration::from_secs(32), "wait {wait:?} above backoff cap");
    }
}

#[tokio::test(start_paused = true)]
async fn pull_keeps_retrying_while_the_provider_is_down() {
    let data_source = Arc::new(FakeDataSource::unreachable_provider());
    let puller = DataPuller::new(
        Arc::new(FakeAuthenticator::issuing("abc123")),
        data_source.clone(),
    );
    let integration = integration("username_password", "obv");
    let config = pull_config(&integration);

    let outcome =
        tokio::time::timeout(Duration::from_secs(3_600), puller.pull(&integration, &config)).await;

    assert!(outcome.is_err(), "pull gave up while the provider was down");
    assert!(data_source.request_count().await > 50);
}

#[tokio::test(start_paused = true)]
async fn token_field_errors_are_not_retried() {
    let authenticator = Arc::new(
        FakeAuthenticator::issuing("abc123").failing_with(vec![AppError::FieldExtraction(
            "field 'access_token' missing from token response".to_owned(),
        )]),
    );
    let data_source = Arc::new(FakeDataSource::serving(json!([])));
    let puller = DataPuller::new(authenticator.clone(), data_source.clone());
    let integration = integration("username_password", "obv");

    let records = puller.pull(&integration, &pull_config(&integration)).await;

    assert!(matches!(records, Err(AppError::FieldExtraction(_))));
    assert_eq!(authenticator.calls.lock().await.len(), 1);
    assert_eq!(data_source.request_count().await, 0);
}
