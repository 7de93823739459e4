//! WebSocket connector backed by tokio-tungstenite.
//!
//! Maps the WebSocket message model onto the text-frame transport port:
//! - Text frames pass through
//! - Binary frames pass through when they are valid UTF-8
//! - Ping/Pong and raw frames are protocol traffic and never surface
//! - A close frame ends the inbound stream

use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::ports::{TransportChannel, TransportConnector, TransportError};

/// Opens real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<TransportChannel, TransportError> {
        tracing::debug!(url = %url, "Opening WebSocket");

        let (ws_stream, _response) = connect_async(url).await.map_err(|e| match e {
            WsError::Http(response) => {
                TransportError::Connect(format!("WebSocket HTTP error: {}", response.status()))
            }
            other => TransportError::Connect(other.to_string()),
        })?;

        let (sink, stream) = ws_stream.split();

        let sink = sink
            .sink_map_err(|e| TransportError::Send(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, TransportError>(Message::Text(text))));

        let stream = stream.filter_map(|item| future::ready(inbound_frame(item)));

        Ok(TransportChannel::new(Box::pin(sink), Box::pin(stream)))
    }
}

/// Decides what a raw WebSocket item means for the telemetry stream.
fn inbound_frame(item: Result<Message, WsError>) -> Option<Result<String, TransportError>> {
    match item {
        Ok(Message::Text(text)) => Some(Ok(text)),
        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => Some(Ok(text)),
            Err(_) => {
                tracing::warn!("Dropping non UTF-8 binary frame");
                None
            }
        },
        Ok(Message::Close(frame)) => {
            if let Some(frame) = frame {
                tracing::debug!(code = %frame.code, reason = %frame.reason, "Server sent close frame");
            }
            None
        }
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => None,
        Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => None,
        Err(e) => Some(Err(TransportError::Receive(e.to_string()))),
    }
}
