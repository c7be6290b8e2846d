use std::io;

use fleet_protocol::logs::ParseQueryError;
use thiserror::Error;

/// Result type used across the fleet core crate.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Canonical error representation shared by all services.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("i/o error: {0}")]
    IoError(#[from] io::Error),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("cannot open log source: {0}")]
    SourceOpen(String),

    #[error("log source failed: {0}")]
    SourceFailed(String),

    #[error("log source fell behind by {0} records")]
    SourceLagged(u64),

    #[error("general error: {0}")]
    GeneralError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("transport error: {0}")]
    TransportError(String),
}

impl FleetError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        FleetError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<ParseQueryError> for FleetError {
    fn from(err: ParseQueryError) -> Self {
        FleetError::invalid_parameter(err.name, err.reason)
    }
}

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        FleetError::DeserializationError(err.to_string())
    }
}

impl From<anyhow::Error> for FleetError {
    fn from(err: anyhow::Error) -> Self {
        FleetError::GeneralError(err.to_string())
    }
}

impl From<axum::Error> for FleetError {
    fn from(err: axum::Error) -> Self {
        FleetError::TransportError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FleetError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FleetError::TransportError(err.to_string())
    }
}

/// Dedicated configuration error used by the configuration module.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {key}: {source}")]
    InvalidEnvVar {
        key: String,
        #[source]
        source: std::env::VarError,
    },

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl From<ConfigError> for FleetError {
    fn from(value: ConfigError) -> Self {
        FleetError::ConfigError(value.to_string())
    }
}
