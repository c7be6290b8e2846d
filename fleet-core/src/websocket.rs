//! Framing of the log streaming protocol over WebSocket.
//!
//! A session starts with one handshake frame holding a JSON
//! [`ErrorResult`]: `{}` when the stream is established, an error notice
//! otherwise. Every following text frame carries exactly one formatted log
//! line, newline included.

use axum::extract::ws::Message;
use fleet_protocol::logs::ErrorResult;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

use crate::errors::{FleetError, Result};

/// Encodes a handshake or error notice frame (server side).
pub fn handshake_message(result: &ErrorResult) -> Result<Message> {
    let serialized = serde_json::to_string(result)
        .map_err(|err| FleetError::SerializationError(err.to_string()))?;
    Ok(Message::Text(serialized))
}

/// Encodes one formatted log line (server side).
pub fn line_message(line: &str) -> Message {
    Message::Text(line.to_string())
}

/// Decodes the handshake frame received by a client.
pub fn decode_handshake(text: &str) -> Result<ErrorResult> {
    let result: ErrorResult = serde_json::from_str(text)?;
    Ok(result)
}

/// Client side of a log stream.
pub struct LogStreamClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl LogStreamClient {
    /// Connects and consumes the handshake frame. An in-band error notice is
    /// returned as [`FleetError::SourceOpen`].
    pub async fn connect(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|err| FleetError::TransportError(format!("invalid url: {err}")))?;
        info!(%url, "connecting to log stream");
        let (stream, _) = connect_async(url.as_str()).await?;
        let mut client = Self { stream };

        let handshake = match client.next_text().await? {
            Some(text) => decode_handshake(&text)?,
            None => {
                return Err(FleetError::TransportError(
                    "connection closed before handshake".into(),
                ))
            }
        };
        if let Some(error) = handshake.error {
            return Err(FleetError::SourceOpen(error.message));
        }
        Ok(client)
    }

    /// Next formatted line, or `None` once the server ended the stream.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.next_text().await
    }

    /// Closes the connection from the client side.
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.stream.next().await {
            match message? {
                TungsteniteMessage::Text(text) => return Ok(Some(text)),
                TungsteniteMessage::Binary(bytes) => {
                    let text = String::from_utf8(bytes)
                        .map_err(|err| FleetError::DeserializationError(err.to_string()))?;
                    return Ok(Some(text));
                }
                TungsteniteMessage::Close(frame) => {
                    debug!(frame = ?frame, "log stream closed by server");
                    return Ok(None);
                }
                other => {
                    debug!(message = ?other, "ignoring control frame");
                }
            }
        }
        Ok(None)
    }
}
