// Request/response RPC over a dedicated message port.
//
// Each endpoint owns a method table, a sequence counter and the callbacks of
// its outstanding calls. Handlers run on the endpoint's listener task and
// answer through a one-shot `Responder`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use annotator_common::protocol::frame_rpc::{FrameRpcMessage, RequestMessage, ResponseMessage};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::window::MessagePort;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortRpcError {
    #[error("methods must be registered before the endpoint connects")]
    AlreadyConnected,

    #[error("endpoint has been destroyed")]
    Destroyed,

    #[error("port is already started or closed")]
    PortUnavailable,

    #[error("call was dropped before a response arrived")]
    NoResponse,
}

type Handler = Arc<dyn Fn(Vec<Value>, Responder) + Send + Sync>;
type Callback = Box<dyn FnOnce(Vec<Value>) + Send>;

/// Answers a single incoming request.
pub struct Responder {
    port: MessagePort,
    sequence: u64,
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder").field("sequence", &self.sequence).finish()
    }
}

impl Responder {
    /// Send the correlated response.
    pub fn respond(self, arguments: Vec<Value>) {
        let response = FrameRpcMessage::Response(ResponseMessage::new(self.sequence, arguments));
        self.port.post_message(response.to_value());
    }
}

struct EndpointState {
    methods: HashMap<String, Handler>,
    callbacks: HashMap<u64, Callback>,
    next_sequence: u64,
    port: Option<MessagePort>,
    listener: Option<JoinHandle<()>>,
    destroyed: bool,
}

/// One side of a frame-rpc channel. Clones share the same endpoint.
#[derive(Clone)]
pub struct PortRpc {
    state: Arc<Mutex<EndpointState>>,
}

impl Default for PortRpc {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PortRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("PortRpc")
            .field("methods", &state.methods.len())
            .field("pending", &state.callbacks.len())
            .field("connected", &state.port.is_some())
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

impl PortRpc {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EndpointState {
                methods: HashMap::new(),
                callbacks: HashMap::new(),
                next_sequence: 1,
                port: None,
                listener: None,
                destroyed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EndpointState> {
        lock_state(&self.state)
    }

    /// Register a handler for `method`. Only allowed before [`connect`].
    ///
    /// [`connect`]: PortRpc::connect
    pub fn on<F>(&self, method: impl Into<String>, handler: F) -> Result<(), PortRpcError>
    where
        F: Fn(Vec<Value>, Responder) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        if state.destroyed {
            return Err(PortRpcError::Destroyed);
        }
        if state.port.is_some() {
            return Err(PortRpcError::AlreadyConnected);
        }
        state.methods.insert(method.into(), Arc::new(handler));
        Ok(())
    }

    /// Bind to `port`, start listening and start the port so that any
    /// messages queued on it are delivered. Must run inside a tokio runtime.
    pub fn connect(&self, port: MessagePort) -> Result<(), PortRpcError> {
        let mut state = self.lock();
        if state.destroyed {
            return Err(PortRpcError::Destroyed);
        }
        if state.port.is_some() {
            return Err(PortRpcError::AlreadyConnected);
        }
        let incoming = port.start().ok_or(PortRpcError::PortUnavailable)?;

        state.port = Some(port.clone());
        state.listener = Some(tokio::spawn(listen(Arc::clone(&self.state), port, incoming)));
        debug!(methods = state.methods.len(), "frame-rpc endpoint connected");
        Ok(())
    }

    /// Invoke `method` on the remote endpoint without waiting for a reply.
    pub fn call(&self, method: &str, arguments: Vec<Value>) {
        self.send_request(method, arguments, None);
    }

    /// Invoke `method`; `callback` runs once with the response arguments.
    pub fn call_with_callback<F>(&self, method: &str, arguments: Vec<Value>, callback: F)
    where
        F: FnOnce(Vec<Value>) + Send + 'static,
    {
        self.send_request(method, arguments, Some(Box::new(callback)));
    }

    /// Invoke `method` and await the response arguments.
    ///
    /// Resolves to [`PortRpcError::NoResponse`] when the call was dropped,
    /// either because the endpoint is not connected or because it was
    /// destroyed while the call was pending.
    pub async fn request(&self, method: &str, arguments: Vec<Value>) -> Result<Vec<Value>, PortRpcError> {
        let (sender, receiver) = oneshot::channel();
        self.call_with_callback(method, arguments, move |reply| {
            let _ = sender.send(reply);
        });
        receiver.await.map_err(|_| PortRpcError::NoResponse)
    }

    fn send_request(&self, method: &str, arguments: Vec<Value>, callback: Option<Callback>) {
        let (port, sequence) = {
            let mut state = self.lock();
            let Some(port) = state.port.clone() else {
                trace!(method, "call on unconnected or destroyed endpoint dropped");
                return;
            };
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            if let Some(callback) = callback {
                state.callbacks.insert(sequence, callback);
            }
            (port, sequence)
        };

        let request = FrameRpcMessage::Request(RequestMessage::new(sequence, method, arguments));
        port.post_message(request.to_value());
    }

    /// Stop listening, close the port and drop the method table and any
    /// pending callbacks.
    pub fn destroy(&self) {
        let (port, listener) = {
            let mut state = self.lock();
            state.destroyed = true;
            state.methods.clear();
            state.callbacks.clear();
            (state.port.take(), state.listener.take())
        };
        if let Some(listener) = listener {
            listener.abort();
        }
        if let Some(port) = port {
            port.close();
        }
        debug!("frame-rpc endpoint destroyed");
    }

    pub fn is_connected(&self) -> bool {
        self.lock().port.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    pub fn pending_calls(&self) -> usize {
        self.lock().callbacks.len()
    }
}

fn lock_state(state: &Mutex<EndpointState>) -> MutexGuard<'_, EndpointState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn listen(
    state: Arc<Mutex<EndpointState>>,
    port: MessagePort,
    mut incoming: mpsc::UnboundedReceiver<Value>,
) {
    while let Some(data) = incoming.recv().await {
        if lock_state(&state).destroyed {
            break;
        }
        match FrameRpcMessage::from_value(&data) {
            Some(FrameRpcMessage::Request(request)) => handle_request(&state, &port, request),
            Some(FrameRpcMessage::Response(response)) => handle_response(&state, response),
            None => trace!("ignoring non frame-rpc message"),
        }
    }
}

fn handle_request(state: &Mutex<EndpointState>, port: &MessagePort, request: RequestMessage) {
    let handler = lock_state(state).methods.get(&request.method).cloned();
    let Some(handler) = handler else {
        trace!(method = %request.method, "no handler registered; request dropped");
        return;
    };
    let responder = Responder { port: port.clone(), sequence: request.sequence };
    handler(request.arguments, responder);
}

fn handle_response(state: &Mutex<EndpointState>, response: ResponseMessage) {
    let callback = lock_state(state).callbacks.remove(&response.response);
    match callback {
        Some(callback) => callback(response.arguments),
        None => trace!(sequence = response.response, "unmatched response dropped"),
    }
}
