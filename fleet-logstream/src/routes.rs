use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use fleet_core::clock::Clock;
use fleet_core::errors::{FleetError, Result};
use fleet_core::signal::{stop_signal, StopSignal};
use fleet_protocol::logs::{parse_query, LogQueryRequest, LogRecord, Severity};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::buffer::LogBuffer;
use crate::handler::LogStreamHandler;
use crate::sink::{LogSink, WebSocketSink};

#[derive(Clone)]
pub struct AppState {
    pub buffer: LogBuffer,
    pub handler: LogStreamHandler,
    pub clock: Arc<dyn Clock>,
    /// Closed when the server shuts down; ends every open session.
    pub server_stop: StopSignal,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/log", get(log_stream_upgrade))
        .route("/v1/logs", post(ingest_records))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

type AppResult<T> = std::result::Result<T, AppError>;

async fn log_stream_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    // Bad parameters are reported in-band once the socket is up.
    let request = parse_query(query.as_deref().unwrap_or_default()).map_err(FleetError::from);
    ws.on_upgrade(move |socket| async move {
        let connection_id = Uuid::new_v4();
        if let Err(err) = handle_socket(socket, state, request, connection_id).await {
            warn!(%connection_id, ?err, "log stream closed with error");
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    request: Result<LogQueryRequest>,
    connection_id: Uuid,
) -> Result<()> {
    let (sender, mut receiver) = socket.split();
    let mut sink = WebSocketSink::new(sender);

    let request = match request {
        Ok(request) => request,
        Err(err) => {
            warn!(%connection_id, ?err, "rejecting log stream request");
            let sent = sink.send_error(&err).await;
            sink.close().await;
            return sent;
        }
    };
    info!(%connection_id, ?request, "log stream requested");

    let (disconnected, client_gone) = stop_signal();
    // Drain incoming frames; the client is gone once the reader ends.
    let reader = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Close(frame)) => {
                    debug!(%connection_id, frame = ?frame, "client closed log stream");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(%connection_id, ?err, "error receiving from log stream client");
                    break;
                }
            }
        }
        drop(disconnected);
    });

    let result = state
        .handler
        .serve(&request, &mut sink, &state.server_stop, &client_gone)
        .await;
    reader.abort();
    sink.close().await;

    let end = result?;
    info!(%connection_id, ?end, "log stream ended");
    Ok(())
}

/// Record accepted by the ingestion endpoint; `time` defaults to now.
#[derive(Debug, Deserialize)]
pub struct IngestRecord {
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    pub entity: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl IngestRecord {
    fn into_record(self, now: DateTime<Utc>) -> LogRecord {
        LogRecord {
            time: self.time.unwrap_or(now),
            entity: self.entity,
            module: self.module,
            location: self.location,
            severity: self.severity,
            message: self.message,
            labels: self.labels,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: usize,
}

async fn ingest_records(
    State(state): State<AppState>,
    Json(records): Json<Vec<IngestRecord>>,
) -> AppResult<Json<IngestResponse>> {
    if let Some(position) = records.iter().position(|record| record.entity.trim().is_empty()) {
        return Err(AppError::bad_request(format!(
            "record {position} has no entity"
        )));
    }

    let now = state.clock.now();
    let accepted = state
        .buffer
        .extend(records.into_iter().map(|record| record.into_record(now)));
    debug!(accepted, retained = state.buffer.len(), "ingested log records");

    Ok(Json(IngestResponse { accepted }))
}

#[derive(Debug, Clone)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request<M: Into<String>>(message: M) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::TimeZone;
    use fleet_core::clock::ManualClock;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn state() -> (AppState, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2015, 6, 19, 15, 34, 37).unwrap());
        let buffer = LogBuffer::new(16, 16);
        let clock_arc: Arc<dyn Clock> = Arc::new(clock.clone());
        let handler = LogStreamHandler::new(
            Arc::new(buffer.clone()),
            clock_arc.clone(),
            Duration::from_secs(60),
        );
        let state = AppState {
            buffer,
            handler,
            clock: clock_arc,
            server_stop: StopSignal::never(),
        };
        (state, clock)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (state, _) = state();
        let response = router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ingests_records_with_clock_time() {
        let (state, _) = state();
        let buffer = state.buffer.clone();
        let body = serde_json::json!([
            { "entity": "machine-0", "module": "juju.worker", "severity": "INFO", "message": "up" },
            { "entity": "machine-1", "message": "also up", "time": "2020-01-01T00:00:00Z" }
        ]);

        let response = router(state)
            .oneshot(
                Request::post("/v1/logs")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: IngestResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.accepted, 2);
        assert_eq!(buffer.len(), 2);
    }

    #[tokio::test]
    async fn rejects_records_without_entity() {
        let (state, _) = state();
        let body = serde_json::json!([{ "entity": " ", "message": "who?" }]);

        let response = router(state)
            .oneshot(
                Request::post("/v1/logs")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn ingest_record_defaults_time_to_now() {
        let now = Utc.with_ymd_and_hms(2015, 6, 19, 15, 34, 37).unwrap();
        let record: IngestRecord =
            serde_json::from_str(r#"{"entity":"machine-0","message":"hi"}"#).unwrap();
        let record = record.into_record(now);
        assert_eq!(record.time, now);
        assert_eq!(record.severity, Severity::Unspecified);
    }
}
