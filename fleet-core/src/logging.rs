use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

use crate::config::Environment;
use crate::errors::{FleetError, Result};

/// Initializes the default tracing subscriber used across services.
///
/// `RUST_LOG` always wins over `level`.
pub fn init_tracing(level: Option<&str>) -> Result<()> {
    let default_level = level.unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(atty::is(atty::Stream::Stdout))
        .try_init()
        .map_err(|err| FleetError::GeneralError(err.to_string()))?;

    Ok(())
}

/// Same as [`init_tracing`] with the default level picked for the environment.
pub fn init_for_environment(environment: Environment) -> Result<()> {
    init_tracing(Some(default_level(environment)))
}

fn default_level(environment: Environment) -> &'static str {
    match environment {
        Environment::Development => "debug",
        Environment::Staging | Environment::Production => "info",
    }
}
