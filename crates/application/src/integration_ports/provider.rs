use async_trait::async_trait;
use pullbridge_core::AppResult;
use pullbridge_domain::AuthenticateConfig;
use serde_json::Value;

/// Exchanges provider credentials for a bearer token.
#[async_trait]
pub trait TokenAuthenticator: Send + Sync {
    /// Requests a token from the configured token endpoint.
    async fn authenticate(&self, auth_config: &AuthenticateConfig) -> AppResult<String>;
}

/// Reads raw tracking data from a provider.
#[async_trait]
pub trait TrackingDataSource: Send + Sync {
    /// Fetches the JSON body served at `url` using a bearer token.
    async fn fetch(&self, url: &str, bearer_token: &str) -> AppResult<Value>;
}
