// JSON-RPC 2.0 server answering requests posted to a window.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use annotator_common::protocol::jsonrpc::{Request, RequestId, Response, RpcError};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::window::{MessageEvent, Window};

type Method = Arc<dyn Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync>;

/// Method table for a [`JsonRpcServer`].
#[derive(Clone, Default)]
pub struct JsonRpcMethods {
    table: HashMap<String, Method>,
}

impl fmt::Debug for JsonRpcMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.table.keys().collect();
        names.sort();
        f.debug_struct("JsonRpcMethods").field("methods", &names).finish()
    }
}

impl JsonRpcMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, method: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Arc::new(method));
        self
    }

    /// Run `request`. Notifications still execute but produce no response.
    pub fn dispatch(&self, request: &Request) -> Option<Response> {
        let result = match self.table.get(&request.method) {
            Some(method) => method(request.positional_params()).map_err(|error| {
                debug!(method = %request.method, %error, "json-rpc handler failed");
                RpcError::method_exception(error.to_string())
            }),
            None => Err(RpcError::method_not_found()),
        };

        let id: RequestId = request.id.clone()?;
        Some(match result {
            Ok(value) => Response::success(id, value),
            Err(error) => Response::error(id, error),
        })
    }
}

/// Serves a method table on a window for an allowlist of origins.
#[derive(Debug)]
pub struct JsonRpcServer {
    listener: JoinHandle<()>,
}

impl JsonRpcServer {
    /// Start answering requests posted to `window`. Must run inside a tokio
    /// runtime.
    pub fn start(window: Window, methods: JsonRpcMethods, allowed_origins: Vec<String>) -> Self {
        let mut incoming = window.subscribe();
        let allowed: HashSet<String> = allowed_origins.into_iter().collect();

        let listener = tokio::spawn(async move {
            let mut warned = HashSet::new();
            while let Some(event) = incoming.recv().await {
                handle_event(&window, &methods, &allowed, &mut warned, event);
            }
        });
        Self { listener }
    }

    pub fn stop(self) {
        self.listener.abort();
    }
}

fn handle_event(
    window: &Window,
    methods: &JsonRpcMethods,
    allowed: &HashSet<String>,
    warned: &mut HashSet<String>,
    event: MessageEvent,
) {
    let Some(request) = Request::from_value(&event.data) else {
        trace!(origin = %event.origin, "ignoring non json-rpc message");
        return;
    };
    if !allowed.contains(&event.origin) {
        if warned.insert(event.origin.clone()) {
            warn!(origin = %event.origin, method = %request.method, "ignoring json-rpc request from unexpected origin");
        }
        return;
    }

    if let Some(response) = methods.dispatch(&request) {
        let reply = match serde_json::to_value(&response) {
            Ok(reply) => reply,
            Err(error) => {
                warn!(%error, "failed to encode json-rpc response");
                return;
            }
        };
        event.source.post_message(window, reply, &event.origin, Vec::new());
    }
}
