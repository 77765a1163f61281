//! Provider configuration
//!
//! Settings come from the provider's attribute map first, then from
//! `COXEDGE_*` environment variables, then from defaults.

use crate::api::{ApiError, Client, RetryConfig, DEFAULT_BASE_URL};
use crate::schema::parse_bool_string;
use crate::tasks::AwaitConfig;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const ENV_API_KEY: &str = "COXEDGE_API_KEY";
pub const ENV_BASE_URL: &str = "COXEDGE_BASE_URL";
pub const ENV_INSECURE: &str = "COXEDGE_INSECURE";
pub const ENV_TASK_POLL_INTERVAL: &str = "COXEDGE_TASK_POLL_INTERVAL";
pub const ENV_TASK_TIMEOUT: &str = "COXEDGE_TASK_TIMEOUT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api_key is required (set in provider config or COXEDGE_API_KEY env var)")]
    MissingApiKey,

    #[error("base_url {url:?} is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("{name} has invalid value {value:?}: expected {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub insecure: bool,
    pub retry: RetryConfig,
    pub await_config: AwaitConfig,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("insecure", &self.insecure)
            .field("retry", &self.retry)
            .field("await_config", &self.await_config)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            insecure: false,
            retry: RetryConfig::default(),
            await_config: AwaitConfig::default(),
        }
    }

    /// Resolve every setting, collecting all problems rather than stopping at
    /// the first.
    pub fn from_attributes(attrs: &Map<String, Value>) -> Result<Self, Vec<ConfigError>> {
        let mut errors = Vec::new();

        let api_key = string_setting(attrs, "api_key", ENV_API_KEY);
        if api_key.is_none() {
            errors.push(ConfigError::MissingApiKey);
        }

        let base_url = string_setting(attrs, "base_url", ENV_BASE_URL)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if let Err(e) = validate_base_url(&base_url) {
            errors.push(e);
        }

        let insecure = match bool_setting(attrs, "insecure", ENV_INSECURE) {
            Ok(insecure) => insecure.unwrap_or(false),
            Err(e) => {
                errors.push(e);
                false
            }
        };

        let mut await_config = AwaitConfig::default();
        let mut polling_overridden = false;
        match seconds_setting(attrs, "task_poll_interval_seconds", ENV_TASK_POLL_INTERVAL) {
            Ok(Some(interval)) => {
                await_config.poll_interval = interval;
                polling_overridden = true;
            }
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
        match seconds_setting(attrs, "task_timeout_seconds", ENV_TASK_TIMEOUT) {
            Ok(Some(timeout)) => {
                await_config.max_wait = timeout;
                polling_overridden = true;
            }
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
        // The attempt bound must not cut a configured timeout short.
        if polling_overridden {
            await_config = await_config.with_attempts_for_max_wait();
        }

        match (api_key, errors.is_empty()) {
            (Some(api_key), true) => Ok(Self {
                api_key,
                base_url,
                insecure,
                retry: RetryConfig::default(),
                await_config,
            }),
            _ => Err(errors),
        }
    }

    pub fn build_client(&self) -> Result<Client, ApiError> {
        Client::with_config(
            &self.base_url,
            &self.api_key,
            self.insecure,
            self.retry.clone(),
        )
    }
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {:?}", other))),
    }
}

fn env_setting(env: &str) -> Option<String> {
    std::env::var(env).ok().filter(|v| !v.trim().is_empty())
}

fn string_setting(attrs: &Map<String, Value>, key: &str, env: &str) -> Option<String> {
    attrs
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| env_setting(env))
}

fn bool_setting(
    attrs: &Map<String, Value>,
    key: &'static str,
    env: &str,
) -> Result<Option<bool>, ConfigError> {
    let invalid = |value: String| ConfigError::InvalidValue {
        name: key,
        value,
        expected: "a boolean",
    };

    match attrs.get(key) {
        Some(Value::Bool(value)) => return Ok(Some(*value)),
        Some(Value::String(raw)) if !raw.trim().is_empty() => {
            return parse_bool_string(raw.trim())
                .map(Some)
                .ok_or_else(|| invalid(raw.clone()));
        }
        Some(Value::String(_)) | Some(Value::Null) | None => {}
        Some(other) => return Err(invalid(other.to_string())),
    }

    env_setting(env)
        .map(|raw| parse_bool_string(raw.trim()).ok_or_else(|| invalid(raw.clone())))
        .transpose()
}

fn seconds_setting(
    attrs: &Map<String, Value>,
    key: &'static str,
    env: &str,
) -> Result<Option<Duration>, ConfigError> {
    let raw = match attrs.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(value) if !value.is_null() => value.to_string(),
        _ => match env_setting(env) {
            Some(raw) => raw,
            None => return Ok(None),
        },
    };

    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Some(Duration::from_secs(seconds))),
        _ => Err(ConfigError::InvalidValue {
            name: key,
            value: raw,
            expected: "a positive whole number of seconds",
        }),
    }
}
