//! WebSocket transport over tokio-tungstenite

use super::Transport;
use crate::errors::{SocketError, SocketResult};
use crate::types::{CloseFrame, WireMessage};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{accept_async, tungstenite, WebSocketStream};

/// Server-side WebSocket connection.
///
/// The WebSocket handshake completes in [`accept_stream`](Self::accept_stream),
/// so the [`Transport::accept`] call is a no-op here; ping frames are
/// answered inline and a close frame from the peer ends the stream.
pub struct WebSocketTransport<S> {
    stream: WebSocketStream<S>,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Perform the server handshake on a raw stream
    pub async fn accept_stream(stream: S) -> SocketResult<Self> {
        let stream = accept_async(stream).await?;
        Ok(Self { stream })
    }

    /// Wrap an already-upgraded WebSocket stream
    pub fn from_stream(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn accept(&mut self) -> SocketResult<()> {
        Ok(())
    }

    async fn close(&mut self, frame: CloseFrame) -> SocketResult<()> {
        let close = tungstenite::protocol::CloseFrame {
            code: tungstenite::protocol::frame::coding::CloseCode::from(frame.code),
            reason: frame.reason.into(),
        };
        match self.stream.close(Some(close)).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn send(&mut self, raw: String) -> SocketResult<()> {
        self.stream
            .send(tungstenite::Message::Text(raw))
            .await
            .map_err(Into::into)
    }

    async fn recv(&mut self) -> Option<SocketResult<WireMessage>> {
        while let Some(item) = self.stream.next().await {
            match item {
                Ok(tungstenite::Message::Text(text)) => return Some(Ok(WireMessage::Text(text))),
                Ok(tungstenite::Message::Binary(data)) => {
                    return Some(Ok(WireMessage::Binary(data)))
                }
                Ok(tungstenite::Message::Ping(payload)) => {
                    // Answered inline; losing a pong to select-cancellation
                    // only delays the peer's liveness check.
                    if self
                        .stream
                        .send(tungstenite::Message::Pong(payload))
                        .await
                        .is_err()
                    {
                        return None;
                    }
                }
                Ok(tungstenite::Message::Pong(_)) => {}
                Ok(tungstenite::Message::Close(_)) => return None,
                Ok(tungstenite::Message::Frame(_)) => {
                    // Raw frames are internal to tungstenite and should never
                    // reach application code
                    unreachable!("raw frames are not exposed by tungstenite's high-level API")
                }
                Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                ) => return None,
                Err(e) => return Some(Err(SocketError::from(e))),
            }
        }
        None
    }
}
