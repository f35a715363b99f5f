// Browsing contexts: an origin, a document, a ready state, and window-level
// `postMessage` delivery with target-origin checks.

pub mod channel;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::trace;
use url::Url;
use uuid::Uuid;

use crate::dom::Document;

pub use channel::{MessageChannel, MessagePort};

/// Origin string of opaque origins (`data:`, sandboxed frames).
pub const OPAQUE_ORIGIN: &str = "null";

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("invalid window url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameAccessError {
    #[error("frame at {frame_origin} is not accessible from {accessor_origin}")]
    CrossOrigin { frame_origin: String, accessor_origin: String },

    #[error("frame has no document")]
    NoDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// A message delivered to a window.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub data: Value,
    /// Origin of the sending window.
    pub origin: String,
    pub source: Window,
    /// Transferred channel ports.
    pub ports: Vec<MessagePort>,
}

struct WindowState {
    url: String,
    document: Option<Document>,
    listeners: Vec<mpsc::UnboundedSender<MessageEvent>>,
}

struct WindowInner {
    id: Uuid,
    origin: String,
    state: Mutex<WindowState>,
    ready: watch::Sender<ReadyState>,
}

/// Shared handle to a browsing context. Clones refer to the same window.
#[derive(Clone)]
pub struct Window {
    inner: Arc<WindowInner>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.inner.id)
            .field("origin", &self.inner.origin)
            .finish()
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Window {}

impl Window {
    /// Create a window showing `url`, with an empty loaded document.
    pub fn new(url: &str) -> Result<Self, WindowError> {
        let parsed = Url::parse(url)?;
        Ok(Self::build(url.to_string(), parsed.origin().ascii_serialization(), Some(Document::new())))
    }

    /// Create an `about:blank` window that inherits `origin` from its creator.
    pub fn about_blank(origin: impl Into<String>) -> Self {
        Self::build("about:blank".to_string(), origin.into(), Some(Document::new()))
    }

    fn build(url: String, origin: String, document: Option<Document>) -> Self {
        let (ready, _) = watch::channel(ReadyState::Complete);
        Self {
            inner: Arc::new(WindowInner {
                id: Uuid::new_v4(),
                origin,
                state: Mutex::new(WindowState { url, document, listeners: Vec::new() }),
                ready,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    /// Record a same-origin navigation (history API style).
    pub fn set_url(&self, url: &str) {
        self.lock().url = url.to_string();
    }

    /// The window's own document, for code running inside it.
    pub fn document(&self) -> Option<Document> {
        self.lock().document.clone()
    }

    pub fn set_document(&self, document: Option<Document>) {
        self.lock().document = document;
    }

    /// The window's document as seen from code running at `accessor_origin`.
    pub fn content_document(&self, accessor_origin: &str) -> Result<Document, FrameAccessError> {
        if self.inner.origin == OPAQUE_ORIGIN || self.inner.origin != accessor_origin {
            return Err(FrameAccessError::CrossOrigin {
                frame_origin: self.inner.origin.clone(),
                accessor_origin: accessor_origin.to_string(),
            });
        }
        self.document().ok_or(FrameAccessError::NoDocument)
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.inner.ready.borrow()
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        self.inner.ready.send_replace(state);
    }

    /// Watch ready-state transitions.
    pub fn ready_changes(&self) -> watch::Receiver<ReadyState> {
        self.inner.ready.subscribe()
    }

    /// Register a message listener. Dropping it unregisters.
    pub fn subscribe(&self) -> MessageListener {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().listeners.push(sender);
        MessageListener { receiver }
    }

    /// Deliver `data` to this window's listeners as sent by `source`.
    ///
    /// Delivery only happens when `target_origin` is `"*"` or equals this
    /// window's origin; otherwise the message and its ports are dropped.
    pub fn post_message(
        &self,
        source: &Window,
        data: Value,
        target_origin: &str,
        ports: Vec<MessagePort>,
    ) {
        if target_origin != "*" && target_origin != self.inner.origin {
            trace!(
                target_origin,
                origin = %self.inner.origin,
                "dropping message for mismatched target origin"
            );
            return;
        }

        let event = MessageEvent {
            data,
            origin: source.origin().to_string(),
            source: source.clone(),
            ports,
        };
        self.lock().listeners.retain(|listener| listener.send(event.clone()).is_ok());
    }
}

/// Receiving side of a window message listener.
#[derive(Debug)]
pub struct MessageListener {
    receiver: mpsc::UnboundedReceiver<MessageEvent>,
}

impl MessageListener {
    pub async fn recv(&mut self) -> Option<MessageEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<MessageEvent> {
        self.receiver.try_recv().ok()
    }
}
