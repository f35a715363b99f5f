// JSON-RPC 2.0 client calling a server in another window.

use std::sync::atomic::{AtomicI64, Ordering};

use annotator_common::protocol::jsonrpc::{Request, RequestId, Response, RpcError};
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::window::Window;

#[derive(Debug, Error, PartialEq)]
pub enum JsonRpcCallError {
    #[error("remote error {}: {}", .0.code, .0.message)]
    Remote(RpcError),

    #[error("response carried neither result nor error")]
    EmptyResponse,

    #[error("window stopped delivering messages")]
    Closed,
}

/// Issues requests from `window`. Ids increase per client starting at 1.
#[derive(Debug)]
pub struct JsonRpcClient {
    window: Window,
    next_id: AtomicI64,
}

impl JsonRpcClient {
    pub fn new(window: Window) -> Self {
        Self { window, next_id: AtomicI64::new(1) }
    }

    /// Call `method` on the server in `target` and await its reply. Only a
    /// reply with the same id from `target` at `target_origin` is accepted.
    pub async fn call(
        &self,
        target: &Window,
        target_origin: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, JsonRpcCallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inbox = self.window.subscribe();

        let request = Request::new(method, Some(Value::Array(params)), RequestId::Number(id));
        let encoded = serde_json::to_value(&request).unwrap_or(Value::Null);
        target.post_message(&self.window, encoded, target_origin, Vec::new());

        while let Some(event) = inbox.recv().await {
            if event.source != *target || event.origin != target_origin {
                continue;
            }
            let Some(response) = Response::from_value(&event.data) else { continue };
            if response.id != RequestId::Number(id) {
                trace!(id = ?response.id, expected = id, "ignoring reply for another call");
                continue;
            }
            return match (response.result, response.error) {
                (_, Some(error)) => Err(JsonRpcCallError::Remote(error)),
                (Some(result), None) => Ok(result),
                (None, None) => Err(JsonRpcCallError::EmptyResponse),
            };
        }
        Err(JsonRpcCallError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::jsonrpc_server::{JsonRpcMethods, JsonRpcServer};
    use annotator_common::protocol::jsonrpc::METHOD_NOT_FOUND;
    use serde_json::json;

    #[tokio::test]
    async fn calls_reach_server_and_resolve() {
        let host = Window::new("https://host.example/").unwrap();
        let sidebar = Window::new("https://sidebar.example/").unwrap();
        let mut methods = JsonRpcMethods::new();
        methods.register("searchUris", |_| Ok(json!(["https://host.example/"])));
        let server = JsonRpcServer::start(host.clone(), methods, vec![sidebar.origin().to_string()]);

        let client = JsonRpcClient::new(sidebar);
        let uris = client.call(&host, "https://host.example", "searchUris", vec![]).await.unwrap();
        assert_eq!(uris, json!(["https://host.example/"]));

        let missing = client.call(&host, "https://host.example", "nope", vec![]).await;
        match missing {
            Err(JsonRpcCallError::Remote(error)) => assert_eq!(error.code, METHOD_NOT_FOUND),
            other => panic!("expected remote error, got {other:?}"),
        }
        server.stop();
    }
}
