// End-to-end tests: records pushed over HTTP come back as lines on the
// WebSocket log stream.
use std::sync::Arc;
use std::time::Duration;

use fleet_core::clock::SystemClock;
use fleet_core::config::CoreConfig;
use fleet_core::websocket::LogStreamClient;
use fleet_logstream::ServerHandle;
use serde_json::json;

async fn start() -> ServerHandle {
    let config = CoreConfig {
        http_bind: "127.0.0.1:0".into(),
        ..CoreConfig::default()
    };
    fleet_logstream::start_server(&config, Arc::new(SystemClock))
        .await
        .expect("service started")
}

async fn push(server: &ServerHandle, records: serde_json::Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/v1/logs", server.addr))
        .json(&records)
        .send()
        .await
        .expect("push records");
    assert!(response.status().is_success());
}

fn record(entity: &str, severity: &str, message: &str) -> serde_json::Value {
    json!({
        "time": "2015-06-19T15:34:37Z",
        "entity": entity,
        "module": "juju.worker",
        "location": "code.go:42",
        "severity": severity,
        "message": message,
    })
}

async fn next_line(client: &mut LogStreamClient) -> Option<String> {
    tokio::time::timeout(Duration::from_secs(5), client.next_line())
        .await
        .expect("line arrives in time")
        .expect("stream healthy")
}

#[tokio::test]
async fn replays_backlog_and_ends_without_tail() {
    let server = start().await;
    push(
        &server,
        json!([
            record("machine-0", "INFO", "first"),
            record("unit-mysql-0", "DEBUG", "skipped by level"),
            record("machine-1", "ERROR", "second"),
        ]),
    )
    .await;

    let url = format!("ws://{}/v1/log?replay=true&noTail=true&level=info", server.addr);
    let mut client = LogStreamClient::connect(&url).await.expect("handshake ok");

    assert_eq!(
        next_line(&mut client).await.as_deref(),
        Some("machine-0: 2015-06-19 15:34:37 INFO juju.worker code.go:42 first\n")
    );
    assert_eq!(
        next_line(&mut client).await.as_deref(),
        Some("machine-1: 2015-06-19 15:34:37 ERROR juju.worker code.go:42 second\n")
    );
    assert_eq!(next_line(&mut client).await, None);

    server.shutdown().await;
}

#[tokio::test]
async fn follows_live_records_until_line_limit() {
    let server = start().await;

    let url = format!(
        "ws://{}/v1/log?includeEntity=unit-*&maxLines=2",
        server.addr
    );
    let mut client = LogStreamClient::connect(&url).await.expect("handshake ok");

    push(
        &server,
        json!([
            record("unit-wordpress-0", "INFO", "one"),
            record("machine-0", "INFO", "filtered"),
            record("unit-mysql-0", "INFO", "two"),
            record("unit-mysql-0", "INFO", "three"),
        ]),
    )
    .await;

    let first = next_line(&mut client).await.expect("first line");
    assert!(first.starts_with("unit-wordpress-0: "));
    assert!(first.ends_with(" one\n"));
    let second = next_line(&mut client).await.expect("second line");
    assert!(second.ends_with(" two\n"));
    assert_eq!(next_line(&mut client).await, None);

    server.shutdown().await;
}

#[tokio::test]
async fn server_shutdown_ends_open_streams() {
    let server = start().await;
    let url = format!("ws://{}/v1/log", server.addr);
    let mut client = LogStreamClient::connect(&url).await.expect("handshake ok");

    server.shutdown().await;

    assert_eq!(next_line(&mut client).await, None);
}

#[tokio::test]
async fn closing_the_client_releases_the_tailer() {
    let server = start().await;
    let buffer = server.state.buffer.clone();
    let url = format!("ws://{}/v1/log", server.addr);
    let client = LogStreamClient::connect(&url).await.expect("handshake ok");
    assert_eq!(buffer.followers(), 1);

    client.close().await.expect("close");

    tokio::time::timeout(Duration::from_secs(5), async {
        while buffer.followers() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("tailer released");

    server.shutdown().await;
}
