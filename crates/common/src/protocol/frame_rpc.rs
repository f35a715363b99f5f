// Message shapes for the frame-rpc protocol spoken over a dedicated channel.
//
// Requests carry a per-endpoint sequence number; responses echo it in
// `response`. Anything without the expected protocol/version tags or with a
// non-array `arguments` field is foreign traffic and is ignored by receivers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL: &str = "frame-rpc";
pub const VERSION: &str = "1.0.0";

/// A method invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub protocol: String,
    pub version: String,
    pub sequence: u64,
    pub method: String,
    pub arguments: Vec<Value>,
}

/// The reply to the request whose sequence number is `response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub protocol: String,
    pub version: String,
    pub response: u64,
    pub arguments: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameRpcMessage {
    Request(RequestMessage),
    Response(ResponseMessage),
}

impl RequestMessage {
    pub fn new(sequence: u64, method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            protocol: PROTOCOL.to_string(),
            version: VERSION.to_string(),
            sequence,
            method: method.into(),
            arguments,
        }
    }
}

impl ResponseMessage {
    pub fn new(response: u64, arguments: Vec<Value>) -> Self {
        Self { protocol: PROTOCOL.to_string(), version: VERSION.to_string(), response, arguments }
    }
}

impl FrameRpcMessage {
    /// Classify a raw channel message. Returns `None` for anything that is not
    /// a well-formed frame-rpc request or response.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.get("protocol").and_then(Value::as_str) != Some(PROTOCOL)
            || object.get("version").and_then(Value::as_str) != Some(VERSION)
        {
            return None;
        }
        if !object.get("arguments").is_some_and(Value::is_array) {
            return None;
        }

        if object.contains_key("method") {
            serde_json::from_value(value.clone()).ok().map(Self::Request)
        } else if object.contains_key("response") {
            serde_json::from_value(value.clone()).ok().map(Self::Response)
        } else {
            None
        }
    }

    pub fn to_value(&self) -> Value {
        let encoded = match self {
            Self::Request(request) => serde_json::to_value(request),
            Self::Response(response) => serde_json::to_value(response),
        };
        // Both shapes are plain structs of strings, integers and JSON values.
        encoded.unwrap_or(Value::Null)
    }
}
