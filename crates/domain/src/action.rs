use pullbridge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::integration::AUTH_ACTION_ID;

/// Action id of the generic pull action.
pub const PULL_DATA_ACTION_ID: &str = "pull_data";

/// Supported provider authentication schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// Username and password exchanged for a bearer token.
    UsernamePassword,
}

impl AuthType {
    /// Returns stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsernamePassword => "username_password",
        }
    }

    /// Parses configuration value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "username_password" => Ok(Self::UsernamePassword),
            _ => Err(AppError::Configuration(format!(
                "invalid auth type '{value}'. Please review the configuration"
            ))),
        }
    }
}

/// Destination collection in the aggregation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// Positional observations.
    Observation,
    /// Discrete events.
    Event,
}

impl OutputType {
    /// Returns the short wire code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observation => "obv",
            Self::Event => "ev",
        }
    }

    /// Parses the wire code. Long-form names are accepted as aliases.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "obv" | "observation" | "observations" => Ok(Self::Observation),
            "ev" | "event" | "events" => Ok(Self::Event),
            _ => Err(AppError::Configuration(format!(
                "invalid output type '{value}'. Please review the configuration"
            ))),
        }
    }
}

fn default_token_field() -> String {
    "token".to_owned()
}

/// Credentials for the provider token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateConfig {
    /// Authentication scheme, e.g. `username_password`.
    pub auth_type: String,
    /// Token endpoint URL.
    pub auth_url: String,
    /// Account username.
    pub username: String,
    /// Account password. Never serialized.
    #[serde(skip_serializing)]
    pub password: String,
    /// Name of the token field in the token endpoint response.
    #[serde(default = "default_token_field")]
    pub token_field: String,
}

impl AuthenticateConfig {
    /// Parses and validates the untyped configuration payload.
    pub fn from_data(data: &Value) -> AppResult<Self> {
        let config: Self = parse_config(AUTH_ACTION_ID, data)?;
        validate_url(AUTH_ACTION_ID, "auth_url", config.auth_url.as_str())?;
        if config.token_field.trim().is_empty() {
            return Err(AppError::Configuration(
                "auth configuration requires a non-empty 'token_field'".to_owned(),
            ));
        }

        Ok(config)
    }

    /// Returns the parsed authentication scheme.
    pub fn auth_type(&self) -> AppResult<AuthType> {
        AuthType::parse(self.auth_type.as_str())
    }
}

/// Parameters of the generic pull action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericPullConfig {
    /// Provider data URL.
    pub url: String,
    /// Filter expression applied to the pulled batch.
    pub jq_filter: String,
    /// Output type code: `obv` or `ev`.
    pub output_type: String,
}

impl GenericPullConfig {
    /// Parses and validates the untyped configuration payload.
    pub fn from_data(data: &Value) -> AppResult<Self> {
        let config: Self = parse_config(PULL_DATA_ACTION_ID, data)?;
        validate_url(PULL_DATA_ACTION_ID, "url", config.url.as_str())?;
        Ok(config)
    }

    /// Returns the parsed output type.
    pub fn output_type(&self) -> AppResult<OutputType> {
        OutputType::parse(self.output_type.as_str())
    }
}

/// Typed action configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionConfiguration {
    /// Provider credentials.
    Authenticate(AuthenticateConfig),
    /// Pull, transform and forward parameters.
    PullData(GenericPullConfig),
}

impl ActionConfiguration {
    /// Parses a configuration record for a known action id.
    pub fn parse(action_id: &str, data: &Value) -> AppResult<Self> {
        match action_id {
            AUTH_ACTION_ID => AuthenticateConfig::from_data(data).map(Self::Authenticate),
            PULL_DATA_ACTION_ID => GenericPullConfig::from_data(data).map(Self::PullData),
            _ => Err(AppError::Configuration(format!(
                "unsupported action '{action_id}'"
            ))),
        }
    }

    /// Returns the action id the configuration belongs to.
    #[must_use]
    pub fn action_id(&self) -> &'static str {
        match self {
            Self::Authenticate(_) => AUTH_ACTION_ID,
            Self::PullData(_) => PULL_DATA_ACTION_ID,
        }
    }

    /// Returns the configuration snapshot that is safe to publish.
    #[must_use]
    pub fn public_data(&self) -> Value {
        let data = match self {
            Self::Authenticate(config) => serde_json::to_value(config),
            Self::PullData(config) => serde_json::to_value(config),
        };

        data.unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Outcome of one action invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Number of data points the aggregation service accepted.
    pub data_points_qty: usize,
}

fn parse_config<T: serde::de::DeserializeOwned>(action_id: &str, data: &Value) -> AppResult<T> {
    serde_json::from_value(data.clone()).map_err(|error| {
        AppError::Configuration(format!(
            "invalid configuration for action '{action_id}': {error}"
        ))
    })
}

fn validate_url(action_id: &str, field: &str, value: &str) -> AppResult<()> {
    url::Url::parse(value).map(|_| ()).map_err(|error| {
        AppError::Configuration(format!(
            "action '{action_id}' field '{field}' is not a valid URL '{value}': {error}"
        ))
    })
}
