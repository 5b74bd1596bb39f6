//! Wire envelope: the structured message unit exchanged over a connection
//!
//! Every frame carries a mandatory `event` field used for dispatch on the
//! server and for client-side routing on the way back out. Inbound frames
//! may flatten the payload next to the event (`{"event": "msg", "text":
//! "hi"}`) or nest it under `data`; outbound frames always use the
//! `{"event": ..., "data": ...}` shape, so decoding an encoded envelope
//! reproduces the original event and payload exactly.

use crate::errors::DecodeError;
use crate::types::WireMessage;
use serde_json::{Map, Value};

/// A decoded event message
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    event: String,
    data: Value,
}

impl Envelope {
    /// Create an envelope from an event name and payload
    pub fn new<T: Into<String>>(event: T, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// The event name this envelope dispatches on
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Borrow the payload
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Consume the envelope, yielding the payload
    pub fn into_data(self) -> Value {
        self.data
    }

    /// Decode a raw frame into an envelope.
    ///
    /// Accepts both payload shapes: a `data` field is taken verbatim,
    /// otherwise every field other than `event` is collected into an
    /// object payload.
    pub fn decode(raw: &WireMessage) -> Result<Self, DecodeError> {
        let value: Value = match raw {
            WireMessage::Text(text) => serde_json::from_str(text)?,
            WireMessage::Binary(bytes) => serde_json::from_slice(bytes)?,
        };

        let Value::Object(mut fields) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let event = match fields.remove("event") {
            Some(Value::String(event)) => event,
            Some(_) => return Err(DecodeError::NonStringEvent),
            None => return Err(DecodeError::MissingEvent),
        };

        let data = match fields.remove("data") {
            Some(data) if fields.is_empty() => data,
            // A frame mixing `data` with flattened fields keeps everything,
            // `data` included, as one object payload.
            Some(data) => {
                fields.insert("data".to_string(), data);
                Value::Object(fields)
            }
            None => Value::Object(fields),
        };

        Ok(Self { event, data })
    }

    /// Encode the envelope into its outbound wire form.
    ///
    /// Infallible: `serde_json::Value` always serializes.
    pub fn encode(&self) -> String {
        let mut frame = Map::with_capacity(2);
        frame.insert("event".to_string(), Value::String(self.event.clone()));
        frame.insert("data".to_string(), self.data.clone());
        Value::Object(frame).to_string()
    }
}
