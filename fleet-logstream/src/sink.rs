use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use fleet_core::errors::{FleetError, Result};
use fleet_core::websocket::{handshake_message, line_message};
use fleet_protocol::logs::ErrorResult;
use futures::stream::SplitSink;
use futures::SinkExt;

/// Outbound side of a log-tail session. Writes are never retried.
#[async_trait]
pub trait LogSink: Send {
    /// Confirms the stream is established. Precedes every line.
    async fn send_ok(&mut self) -> Result<()>;

    /// Reports a failure to the client in-band.
    async fn send_error(&mut self, err: &FleetError) -> Result<()>;

    async fn send_line(&mut self, line: &str) -> Result<()>;
}

/// Sink writing protocol frames to the sending half of a WebSocket.
pub struct WebSocketSink {
    sender: SplitSink<WebSocket, Message>,
}

impl WebSocketSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }

    /// Sends a close frame; failures are irrelevant at this point.
    pub async fn close(mut self) {
        let _ = self.sender.send(Message::Close(None)).await;
        let _ = self.sender.close().await;
    }

    async fn send(&mut self, message: Message) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|err| FleetError::TransportError(err.to_string()))
    }
}

#[async_trait]
impl LogSink for WebSocketSink {
    async fn send_ok(&mut self) -> Result<()> {
        let message = handshake_message(&ErrorResult::ok())?;
        self.send(message).await
    }

    async fn send_error(&mut self, err: &FleetError) -> Result<()> {
        let message = handshake_message(&ErrorResult::from_message(err.to_string()))?;
        self.send(message).await
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.send(line_message(line)).await
    }
}
