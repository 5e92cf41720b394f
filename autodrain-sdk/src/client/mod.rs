//! WebSocket control client.
//!
//! Gated behind the `client` cargo feature so crates that only need the
//! wire types do not pull in `tokio-tungstenite`.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::objects::{ClientCommand, ServerMessage, StartConfig};

/// Errors produced by [`ControlClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Handshake or transport failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Typed client for the `/ws` control endpoint.
pub struct ControlClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ControlClient {
    /// Connect to the control endpoint, e.g. `ws://127.0.0.1:3000/ws`.
    pub async fn connect(url: &Url) -> Result<Self, ClientError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(Self { stream })
    }

    /// Send a command frame.
    pub async fn send(&mut self, command: &ClientCommand) -> Result<(), ClientError> {
        let json = serde_json::to_string(command)?;
        self.send_raw(json).await
    }

    /// Send an arbitrary text frame. Useful for exercising the server's
    /// handling of malformed input.
    pub async fn send_raw(&mut self, text: impl Into<String>) -> Result<(), ClientError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// `{"command":"start"}`.
    pub async fn start(&mut self, config: StartConfig) -> Result<(), ClientError> {
        self.send(&ClientCommand::Start { config }).await
    }

    /// `{"command":"stop"}`.
    pub async fn stop(&mut self) -> Result<(), ClientError> {
        self.send(&ClientCommand::Stop).await
    }

    /// Wait for the next server message.
    ///
    /// Control frames are skipped. Returns `Ok(None)` once the server closes
    /// the connection.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Read messages until a status frame with the given `running` value
    /// arrives, returning the log frames seen on the way.
    pub async fn wait_for_status(
        &mut self,
        running: bool,
    ) -> Result<Vec<ServerMessage>, ClientError> {
        let mut seen = Vec::new();
        while let Some(msg) = self.next_message().await? {
            if msg == (ServerMessage::Status { running }) {
                return Ok(seen);
            }
            seen.push(msg);
        }
        Err(ClientError::WebSocket(
            tokio_tungstenite::tungstenite::Error::ConnectionClosed,
        ))
    }

    /// Close the connection gracefully.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
