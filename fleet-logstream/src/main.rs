use std::sync::Arc;

use anyhow::Context;
use fleet_core::clock::SystemClock;
use fleet_core::config::CoreConfig;
use fleet_core::logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CoreConfig::from_env().context("failed to load log stream configuration")?;

    if let Err(err) = logging::init_for_environment(config.environment) {
        eprintln!("⚠️ failed to initialise tracing: {err}");
    }

    let server = fleet_logstream::start_server(&config, Arc::new(SystemClock)).await?;
    shutdown_signal().await;
    info!("shutting down fleet-logstream");
    server.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
