//! Test support: an in-memory scripted transport
//!
//! Lets tests drive a full session without a socket: the controller
//! pushes inbound frames (or a transport fault), the log records what the
//! session did with the transport, and dropping the controller signals a
//! client disconnect.

use crate::envelope::Envelope;
use crate::errors::{SocketError, SocketResult};
use crate::transport::Transport;
use crate::types::{CloseFrame, WireMessage};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Everything a session did to its transport
#[derive(Default)]
pub struct TransportLog {
    accepted: AtomicBool,
    sent: Mutex<Vec<String>>,
    closed: Mutex<Option<CloseFrame>>,
}

impl TransportLog {
    /// Whether the session completed the accept handshake
    pub fn accepted(&self) -> bool {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Raw frames the session wrote, in order
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Sent frames decoded into `(event, data)` pairs
    pub fn sent_events(&self) -> Vec<(String, Value)> {
        self.sent_frames()
            .iter()
            .map(|frame| {
                let value: Value = serde_json::from_str(frame).expect("sent frame is JSON");
                let event = value["event"].as_str().expect("sent frame has event").to_string();
                (event, value["data"].clone())
            })
            .collect()
    }

    /// The close frame the session sent, if it closed the connection
    pub fn close_frame(&self) -> Option<CloseFrame> {
        self.closed.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.lock().unwrap().is_some()
    }
}

/// Feeds inbound traffic to a [`ScriptedTransport`].
///
/// Dropping the controller ends the inbound stream, which the session
/// observes as a client disconnect.
pub struct TransportController {
    tx: mpsc::UnboundedSender<SocketResult<WireMessage>>,
}

impl TransportController {
    /// Push a raw text frame
    pub fn push_text<S: Into<String>>(&self, raw: S) {
        let _ = self.tx.send(Ok(WireMessage::Text(raw.into())));
    }

    /// Push a raw binary frame
    pub fn push_binary<B: Into<Vec<u8>>>(&self, raw: B) {
        let _ = self.tx.send(Ok(WireMessage::Binary(raw.into())));
    }

    /// Push a well-formed inbound event frame
    pub fn push_event(&self, event: &str, data: Value) {
        self.push_text(Envelope::new(event, data).encode());
    }

    /// Push a fatal transport error
    pub fn push_error(&self, error: SocketError) {
        let _ = self.tx.send(Err(error));
    }

    /// End the inbound stream, signalling a client disconnect
    pub fn finish(self) {}
}

/// In-memory [`Transport`] driven by a [`TransportController`]
pub struct ScriptedTransport {
    incoming: mpsc::UnboundedReceiver<SocketResult<WireMessage>>,
    log: Arc<TransportLog>,
}

impl ScriptedTransport {
    /// The log this transport records into
    pub fn log(&self) -> Arc<TransportLog> {
        Arc::clone(&self.log)
    }
}

/// Create a scripted transport and its controller
pub fn scripted() -> (ScriptedTransport, TransportController) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ScriptedTransport {
            incoming: rx,
            log: Arc::new(TransportLog::default()),
        },
        TransportController { tx },
    )
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn accept(&mut self) -> SocketResult<()> {
        self.log.accepted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self, frame: CloseFrame) -> SocketResult<()> {
        let mut closed = self.log.closed.lock().unwrap();
        if closed.is_none() {
            *closed = Some(frame);
        }
        Ok(())
    }

    async fn send(&mut self, raw: String) -> SocketResult<()> {
        self.log.sent.lock().unwrap().push(raw);
        Ok(())
    }

    async fn recv(&mut self) -> Option<SocketResult<WireMessage>> {
        self.incoming.recv().await
    }
}
