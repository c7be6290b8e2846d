// Tests for the REST surface of the log stream service.
use std::sync::Arc;

use fleet_core::clock::SystemClock;
use fleet_core::config::CoreConfig;
use serde_json::json;

fn local_config() -> CoreConfig {
    CoreConfig {
        http_bind: "127.0.0.1:0".into(),
        ..CoreConfig::default()
    }
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let server = fleet_logstream::start_server(&local_config(), Arc::new(SystemClock))
        .await
        .expect("service started");

    let response = reqwest::Client::new()
        .get(format!("http://{}/health", server.addr))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.expect("body"), "ok");

    server.shutdown().await;
}

#[tokio::test]
async fn ingest_endpoint_counts_records() {
    let server = fleet_logstream::start_server(&local_config(), Arc::new(SystemClock))
        .await
        .expect("service started");
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/v1/logs", server.addr))
        .json(&json!([
            { "entity": "machine-0", "module": "juju.worker", "severity": "INFO", "message": "one" },
            { "entity": "machine-1", "message": "two" }
        ]))
        .send()
        .await
        .expect("request succeeds");
    assert!(response.status().is_success());
    let body = response.json::<serde_json::Value>().await.expect("json body");
    assert_eq!(body["accepted"], 2);
    assert_eq!(server.state.buffer.len(), 2);

    let rejected = client
        .post(format!("http://{}/v1/logs", server.addr))
        .json(&json!([{ "entity": " ", "message": "nobody" }]))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(server.state.buffer.len(), 2);

    server.shutdown().await;
}
