// Entangled message ports. Messages posted to one port arrive at its peer;
// they queue until the peer is started and are dropped once either end is
// closed.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

#[derive(Default)]
struct PortState {
    peer: Option<Weak<PortInner>>,
    queue: VecDeque<Value>,
    receiver: Option<mpsc::UnboundedSender<Value>>,
    started: bool,
    closed: bool,
}

struct PortInner {
    id: Uuid,
    state: Mutex<PortState>,
}

impl PortInner {
    fn lock(&self) -> MutexGuard<'_, PortState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, data: Value) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        match &state.receiver {
            Some(receiver) => {
                if receiver.send(data).is_err() {
                    state.receiver = None;
                }
            }
            None => state.queue.push_back(data),
        }
    }
}

/// One end of a [`MessageChannel`]. Clones are handles to the same end.
#[derive(Clone)]
pub struct MessagePort {
    inner: Arc<PortInner>,
}

impl fmt::Debug for MessagePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePort").field("id", &self.inner.id).finish()
    }
}

impl PartialEq for MessagePort {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl MessagePort {
    fn detached() -> Self {
        Self { inner: Arc::new(PortInner { id: Uuid::new_v4(), state: Mutex::default() }) }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Send `data` to the entangled port.
    pub fn post_message(&self, data: Value) {
        let peer = {
            let state = self.inner.lock();
            if state.closed {
                trace!(port = %self.inner.id, "post on closed port dropped");
                return;
            }
            state.peer.as_ref().and_then(Weak::upgrade)
        };
        match peer {
            Some(peer) => peer.deliver(data),
            None => trace!(port = %self.inner.id, "peer gone; message dropped"),
        }
    }

    /// Begin delivery. Queued messages are flushed into the returned receiver
    /// first. Returns `None` if the port was already started or is closed.
    pub fn start(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        let mut state = self.inner.lock();
        if state.started || state.closed {
            return None;
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        for data in state.queue.drain(..) {
            // The receiver is alive in this scope.
            let _ = sender.send(data);
        }
        state.receiver = Some(sender);
        state.started = true;
        Some(receiver)
    }

    /// Close this end. Pending and future messages in either direction are
    /// dropped and this end's receiver ends.
    pub fn close(&self) {
        let mut state = self.inner.lock();
        state.closed = true;
        state.receiver = None;
        state.queue.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn is_started(&self) -> bool {
        self.inner.lock().started
    }
}

/// A pair of entangled ports.
#[derive(Debug, Clone)]
pub struct MessageChannel {
    pub port1: MessagePort,
    pub port2: MessagePort,
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageChannel {
    pub fn new() -> Self {
        let port1 = MessagePort::detached();
        let port2 = MessagePort::detached();
        port1.inner.lock().peer = Some(Arc::downgrade(&port2.inner));
        port2.inner.lock().peer = Some(Arc::downgrade(&port1.inner));
        Self { port1, port2 }
    }
}
