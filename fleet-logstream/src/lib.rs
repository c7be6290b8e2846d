//! Live log-tail service.
//!
//! Clients open `GET /v1/log` as a WebSocket and receive one text frame per
//! formatted record after an initial handshake frame; producers push
//! records through `POST /v1/logs`.

pub mod buffer;
pub mod filter;
pub mod format;
pub mod handler;
pub mod routes;
pub mod sink;
pub mod source;
pub mod translate;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use fleet_core::clock::Clock;
use fleet_core::config::CoreConfig;
use fleet_core::signal::{stop_signal, StopTrigger};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use buffer::LogBuffer;
pub use format::format_record;
pub use handler::{LogStreamHandler, StreamEnd};
pub use routes::{router, AppState};
pub use sink::{LogSink, WebSocketSink};
pub use source::{LogTailer, LogTailerFactory};
pub use translate::translate;

/// Builds the shared service state. The returned trigger ends every open
/// session when fired or dropped.
pub fn build_state(config: &CoreConfig, clock: Arc<dyn Clock>) -> (AppState, StopTrigger) {
    let buffer = LogBuffer::new(config.log_buffer_capacity, config.tailer_channel_capacity);
    let handler = LogStreamHandler::new(
        Arc::new(buffer.clone()),
        clock.clone(),
        config.log_tail_timeout,
    );
    let (trigger, server_stop) = stop_signal();
    let state = AppState {
        buffer,
        handler,
        clock,
        server_stop,
    };
    (state, trigger)
}

/// Handle returned when the service is started programmatically.
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub state: AppState,
    stop_sessions: StopTrigger,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Ends every open session, then stops accepting connections.
    pub async fn shutdown(self) {
        self.stop_sessions.fire();
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            error!(?err, "log stream server task failed");
        }
    }
}

pub async fn start_server(config: &CoreConfig, clock: Arc<dyn Clock>) -> anyhow::Result<ServerHandle> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("invalid log stream bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind log stream listener")?;
    let actual_addr = listener
        .local_addr()
        .context("failed to read socket address")?;
    info!(%actual_addr, node = %config.node_name, "starting fleet-logstream");

    let (state, stop_sessions) = build_state(config, clock);
    let app = router(state.clone());
    let (tx, rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await
        {
            error!(?err, "log stream server terminated with error");
        }
    });

    Ok(ServerHandle {
        addr: actual_addr,
        state,
        stop_sessions,
        shutdown: tx,
        task,
    })
}
