// Setup failures reach the client as an error notice in place of the
// handshake; no log lines follow.
use std::sync::Arc;

use fleet_core::clock::SystemClock;
use fleet_core::config::CoreConfig;
use fleet_core::errors::FleetError;
use fleet_core::websocket::{decode_handshake, LogStreamClient};
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

async fn start() -> fleet_logstream::ServerHandle {
    let config = CoreConfig {
        http_bind: "127.0.0.1:0".into(),
        ..CoreConfig::default()
    };
    fleet_logstream::start_server(&config, Arc::new(SystemClock))
        .await
        .expect("service started")
}

#[tokio::test]
async fn invalid_parameter_is_reported_in_band() {
    let server = start().await;
    let url = format!("ws://{}/v1/log?level=loud", server.addr);

    match LogStreamClient::connect(&url).await {
        Err(FleetError::SourceOpen(message)) => {
            assert!(message.contains("level"), "unexpected message: {message}");
        }
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("handshake should carry an error"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn error_notice_is_the_only_frame() {
    let server = start().await;
    let url = format!("ws://{}/v1/log?maxLines=lots", server.addr);
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("upgrade");

    let mut texts = Vec::new();
    while let Some(message) = socket.next().await {
        match message {
            Ok(Message::Text(text)) => texts.push(text),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    assert_eq!(texts.len(), 1);
    let notice = decode_handshake(&texts[0]).expect("notice decodes");
    let error = notice.error.expect("error notice");
    assert!(error.message.contains("maxLines"));

    server.shutdown().await;
}
