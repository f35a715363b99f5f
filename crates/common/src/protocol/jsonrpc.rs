// JSON-RPC 2.0 request/response types for the window-level control channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request. Requests without an `id` are notifications and
/// never receive a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

/// A JSON-RPC 2.0 response carrying either `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: RequestId,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Request ID: integer, string, or null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

// Error codes.
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
/// A registered handler failed; the message is the handler's error.
pub const METHOD_EXCEPTION: i32 = -32000;

impl Request {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), method: method.into(), params, id: Some(id) }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), method: method.into(), params, id: None }
    }

    /// Parse a raw message as a JSON-RPC 2.0 request. Anything else, including
    /// JSON-RPC responses and other protocols, yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION)
            || !object.get("method").is_some_and(Value::is_string)
        {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Positional parameters. Object parameters are passed as a single
    /// argument; a missing `params` is an empty list.
    pub fn positional_params(&self) -> Vec<Value> {
        match &self.params {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        }
    }
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), result: Some(result), error: None, id }
    }

    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), result: None, error: Some(error), id }
    }

    /// Parse a raw message as a JSON-RPC 2.0 response.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION)
            || object.contains_key("method")
        {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

impl RpcError {
    pub fn method_not_found() -> Self {
        Self { code: METHOD_NOT_FOUND, message: "Method not found".to_string(), data: None }
    }

    pub fn method_exception(message: impl Into<String>) -> Self {
        Self { code: METHOD_EXCEPTION, message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_with_id() {
        let request = Request::new("searchUris", Some(json!([])), RequestId::Number(1));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "jsonrpc": "2.0", "method": "searchUris", "params": [], "id": 1 })
        );
    }

    #[test]
    fn notification_omits_id() {
        let request = Request::notification("focus", None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "jsonrpc": "2.0", "method": "focus" })
        );
    }

    #[test]
    fn error_response_shape() {
        let response = Response::error(RequestId::Number(4), RpcError::method_not_found());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "error": { "code": -32601, "message": "Method not found" },
                "id": 4,
            })
        );
    }

    #[test]
    fn request_from_value_requires_version_and_method() {
        assert!(Request::from_value(&json!({ "jsonrpc": "2.0", "method": "m", "id": 1 })).is_some());
        assert!(Request::from_value(&json!({ "jsonrpc": "1.0", "method": "m", "id": 1 })).is_none());
        assert!(Request::from_value(&json!({ "jsonrpc": "2.0", "id": 1 })).is_none());
        assert!(Request::from_value(&json!({ "jsonrpc": "2.0", "method": 5 })).is_none());
        assert!(Request::from_value(&json!("hello")).is_none());
    }

    #[test]
    fn response_from_value_rejects_requests() {
        let request = json!({ "jsonrpc": "2.0", "method": "m", "id": 1 });
        assert!(Response::from_value(&request).is_none());
        let reply = json!({ "jsonrpc": "2.0", "result": true, "id": 1 });
        assert_eq!(Response::from_value(&reply).unwrap().result, Some(json!(true)));
    }

    #[test]
    fn positional_params_variants() {
        let none = Request::notification("m", None);
        assert!(none.positional_params().is_empty());
        let list = Request::notification("m", Some(json!([1, 2])));
        assert_eq!(list.positional_params(), vec![json!(1), json!(2)]);
        let object = Request::notification("m", Some(json!({ "a": 1 })));
        assert_eq!(object.positional_params(), vec![json!({ "a": 1 })]);
    }

    #[test]
    fn string_ids_round_trip() {
        let id: RequestId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id, RequestId::String("abc".into()));
    }
}
