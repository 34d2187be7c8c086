//! Runtime settings read from `AUTODEPLOY_*` environment variables.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL_NAME: &str = "auto-deploy-openai/gpt-4-turbo-2024-04-09";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_LOG_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got `{value}`")]
    InvalidSeconds { name: &'static str, value: String },

    #[error("{name} must not be zero")]
    Zero { name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub openai_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub model_name: String,
    pub platform_base_url: Option<String>,
    pub platform_api_key: Option<String>,
    pub debug: bool,
    /// Timeout of every outbound HTTP request.
    pub request_timeout: Duration,
    /// How long container logs are followed before the tool returns.
    pub log_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_base_url: None,
            openai_api_key: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            platform_base_url: None,
            platform_api_key: None,
            debug: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log_window: DEFAULT_LOG_WINDOW,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        Ok(Self {
            openai_base_url: get("AUTODEPLOY_OPENAI_BASE_URL"),
            openai_api_key: get("AUTODEPLOY_OPENAI_API_KEY"),
            model_name: get("AUTODEPLOY_MODEL_NAME").unwrap_or(defaults.model_name),
            platform_base_url: get("AUTODEPLOY_PLATFORM_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
            platform_api_key: get("AUTODEPLOY_PLATFORM_API_KEY"),
            debug: get("AUTODEPLOY_DEBUG").is_some(),
            request_timeout: seconds(
                "AUTODEPLOY_REQUEST_TIMEOUT_SECS",
                get("AUTODEPLOY_REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout,
            )?,
            log_window: seconds(
                "AUTODEPLOY_LOG_WINDOW_SECS",
                get("AUTODEPLOY_LOG_WINDOW_SECS"),
                defaults.log_window,
            )?,
        })
    }
}

fn seconds(name: &'static str, value: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let secs: u64 = value
        .parse()
        .map_err(|_| ConfigError::InvalidSeconds { name, value: value.clone() })?;
    if secs == 0 {
        return Err(ConfigError::Zero { name });
    }
    Ok(Duration::from_secs(secs))
}
