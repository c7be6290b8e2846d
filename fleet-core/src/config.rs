use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{ConfigError, FleetError};

const DEFAULT_HTTP_BIND: &str = "0.0.0.0:17070";
const DEFAULT_NODE_NAME: &str = "fleet-node";
const DEFAULT_LOG_TAIL_TIMEOUT_SECS: u64 = 24 * 60 * 60;
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 10_000;
const DEFAULT_TAILER_CHANNEL_CAPACITY: usize = 1024;

/// Runtime environment used by the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    fn from_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

/// Global configuration shared across the services.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub environment: Environment,
    pub node_name: String,
    pub http_bind: String,
    /// Absolute lifetime of a single log-tail session.
    pub log_tail_timeout: Duration,
    /// Records retained for replay by the in-memory log source.
    pub log_buffer_capacity: usize,
    /// Records buffered between a tailer's producer task and its session.
    pub tailer_channel_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            node_name: DEFAULT_NODE_NAME.to_string(),
            http_bind: DEFAULT_HTTP_BIND.to_string(),
            log_tail_timeout: Duration::from_secs(DEFAULT_LOG_TAIL_TIMEOUT_SECS),
            log_buffer_capacity: DEFAULT_LOG_BUFFER_CAPACITY,
            tailer_channel_capacity: DEFAULT_TAILER_CHANNEL_CAPACITY,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment (`FLEET_*`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env_with_prefix("FLEET_")
    }

    /// Loads configuration from env vars prefixed with the provided value (e.g. `LOGSTREAM_`).
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let key = |suffix: &str| format!("{}{}", prefix, suffix);

        let environment = read_var(&key("ENV"))?
            .map(|raw| Environment::from_str(&raw))
            .unwrap_or_default();

        let node_name =
            read_var(&key("NODE_NAME"))?.unwrap_or_else(|| DEFAULT_NODE_NAME.to_string());
        let http_bind =
            read_var(&key("HTTP_BIND"))?.unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string());

        let timeout_secs: u64 =
            read_positive(&key("LOG_TAIL_TIMEOUT_SECS"), DEFAULT_LOG_TAIL_TIMEOUT_SECS)?;
        let log_buffer_capacity =
            read_positive(&key("LOG_BUFFER_CAPACITY"), DEFAULT_LOG_BUFFER_CAPACITY)?;
        let tailer_channel_capacity =
            read_positive(&key("LOG_TAILER_CHANNEL"), DEFAULT_TAILER_CHANNEL_CAPACITY)?;

        Ok(Self {
            environment,
            node_name,
            http_bind,
            log_tail_timeout: Duration::from_secs(timeout_secs),
            log_buffer_capacity,
            tailer_channel_capacity,
        })
    }

    /// Whether the service is running in production.
    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    pub fn bind_address(&self) -> &str {
        &self.http_bind
    }
}

/// Helper that loads config and converts to the canonical fleet error type.
pub fn load_core_config() -> Result<CoreConfig, FleetError> {
    Ok(CoreConfig::from_env()?)
}

fn read_var(key: &str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(ConfigError::InvalidEnvVar {
            key: key.to_string(),
            source,
        }),
    }
}

fn read_positive<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let Some(raw) = read_var(key)? else {
        return Ok(default);
    };
    let value = raw.parse::<T>().map_err(|err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.clone(),
        reason: err.to_string(),
    })?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_for_unset_prefix() {
        let cfg = CoreConfig::from_env_with_prefix("FLEET_TEST_UNSET_").expect("config should load");
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.http_bind, DEFAULT_HTTP_BIND);
        assert_eq!(cfg.log_tail_timeout, Duration::from_secs(86_400));
    }

    #[test]
    fn reads_prefixed_values() {
        env::set_var("FLEET_TEST_A_ENV", "prod");
        env::set_var("FLEET_TEST_A_LOG_TAIL_TIMEOUT_SECS", "60");
        env::set_var("FLEET_TEST_A_LOG_BUFFER_CAPACITY", "32");
        let cfg = CoreConfig::from_env_with_prefix("FLEET_TEST_A_").expect("config should load");
        assert!(cfg.is_production());
        assert_eq!(cfg.log_tail_timeout, Duration::from_secs(60));
        assert_eq!(cfg.log_buffer_capacity, 32);
    }

    #[test]
    fn rejects_zero_and_garbage() {
        env::set_var("FLEET_TEST_B_LOG_TAIL_TIMEOUT_SECS", "0");
        let err = CoreConfig::from_env_with_prefix("FLEET_TEST_B_").unwrap_err();
        assert!(err.to_string().contains("greater than zero"));

        env::set_var("FLEET_TEST_C_LOG_BUFFER_CAPACITY", "lots");
        let err = CoreConfig::from_env_with_prefix("FLEET_TEST_C_").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
