//! WebSocket implementation of the frame [`Channel`].

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{info, trace};

use kotori_core::{Channel, TransportError, TransportResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`Channel`] carried over a client-mode WebSocket connection.
///
/// Text and binary messages both surface as frames; Ping is answered inline
/// and Pong is swallowed. A Close frame or stream end is reported as
/// [`TransportError::ConnectionClosed`].
pub struct WsChannel {
    stream: WsStream,
    url: String,
}

impl WsChannel {
    /// Connects to a WebSocket endpoint.
    pub async fn connect(url: &str) -> TransportResult<Self> {
        info!(url = %url, "Connecting to WebSocket endpoint");

        let (stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        info!(url = %url, "WebSocket connected");

        Ok(Self {
            stream,
            url: url.to_string(),
        })
    }

    /// The URL this channel is connected to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Channel for WsChannel {
    async fn send(&mut self, frame: Vec<u8>) -> TransportResult<()> {
        let msg = Message::Text(String::from_utf8_lossy(&frame).to_string().into());
        self.stream
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> TransportResult<Vec<u8>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(url = %self.url, len = text.len(), "Received text frame");
                    return Ok(text.as_bytes().to_vec());
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(url = %self.url, len = data.len(), "Received binary frame");
                    return Ok(data.to_vec());
                }
                Some(Ok(Message::Ping(data))) => {
                    trace!(url = %self.url, "Received ping, sending pong");
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
                }
                Some(Ok(Message::Pong(_))) => {
                    trace!(url = %self.url, "Received pong");
                }
                Some(Ok(Message::Close(_))) | Some(Ok(Message::Frame(_))) => {
                    return Err(TransportError::closed("server closed connection"));
                }
                Some(Err(e)) => {
                    return Err(TransportError::Io(e.to_string()));
                }
                None => {
                    return Err(TransportError::closed("stream ended"));
                }
            }
        }
    }
}
