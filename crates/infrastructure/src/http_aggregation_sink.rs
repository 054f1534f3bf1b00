use async_trait::async_trait;
use pullbridge_application::AggregationSink;
use pullbridge_core::{AppError, AppResult, IntegrationId};
use serde_json::Value;
use tracing::{debug, info};

use crate::http_response::{ensure_success, read_json, transport_error};

const INTEGRATION_ID_HEADER: &str = "X-Integration-Id";

/// REST client for the aggregation service's observation and event endpoints.
#[derive(Clone)]
pub struct HttpAggregationSink {
    http_client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpAggregationSink {
    /// Creates a sink for the aggregation service at `base_url`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_token: api_token.into(),
        }
    }

    async fn post_records(
        &self,
        collection: &str,
        records: Vec<Value>,
        integration_id: IntegrationId,
    ) -> AppResult<Vec<Value>> {
        if records.is_empty() {
            debug!(%integration_id, collection, "no records to send");
            return Ok(Vec::new());
        }

        let url = format!("{}/v2/{collection}/", self.base_url);
        let record_count = records.len();
        let response = self
            .http_client
            .post(url.as_str())
            .bearer_auth(self.api_token.as_str())
            .header(INTEGRATION_ID_HEADER, integration_id.to_string())
            .json(&records)
            .send()
            .await
            .map_err(|error| transport_error("aggregation request", &error))?;
        let response = ensure_success(response)?;
        let body = read_json(response, "aggregation service", AppError::Validation).await?;

        let acknowledgements = match body {
            Value::Array(acknowledgements) => acknowledgements,
            Value::Object(mut object) => match object.remove("data") {
                Some(Value::Array(acknowledgements)) => acknowledgements,
                _ => vec![Value::Object(object)],
            },
            other => {
                return Err(AppError::Validation(format!(
                    "aggregation service returned unexpected acknowledgement {other}"
                )));
            }
        };

        info!(
            %integration_id,
            collection,
            record_count,
            accepted = acknowledgements.len(),
            "records delivered"
        );

        Ok(acknowledgements)
    }
}

#[async_trait]
impl AggregationSink for HttpAggregationSink {
    async fn send_observations(
        &self,
        observations: Vec<Value>,
        integration_id: IntegrationId,
    ) -> AppResult<Vec<Value>> {
        self.post_records("observations", observations, integration_id)
            .await
    }

    async fn send_events(
        &self,
        events: Vec<Value>,
        integration_id: IntegrationId,
    ) -> AppResult<Vec<Value>> {
        self.post_records("events", events, integration_id).await
    }
}
