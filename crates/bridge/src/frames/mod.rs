// Discovery of annotatable iframes.
//
// The observer tracks iframes below a root element that carry the opt-in
// attribute, and offers each newly seen frame to a listener once its
// document is ready. Tree mutations are debounced into re-scans.

pub mod debounce;
pub mod injector;
pub mod ready;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

use crate::config::FramesConfig;
use crate::dom::{Document, MutationReceiver, NodeId, ObserveOptions};
use crate::window::{FrameAccessError, Window};

use self::debounce::{DebounceConfig, Debouncer};

pub use injector::FrameInjector;

/// Presence attribute that opts an iframe into annotation.
pub const DEFAULT_OPT_IN_ATTRIBUTE: &str = "enable-annotation";

/// A frame offered to a [`FrameListener`].
#[derive(Debug, Clone)]
pub struct AnnotatableFrame {
    pub element: NodeId,
    pub window: Window,
}

/// Receives frames as they become available.
pub trait FrameListener: Send + Sync {
    /// Called once per frame after its document is ready. Errors are logged
    /// and the frame is not offered again while it stays attached.
    fn frame_added(&self, frame: &AnnotatableFrame) -> anyhow::Result<()>;

    /// Called when a tracked frame is detached or loses the opt-in attribute.
    fn frame_removed(&self, _element: NodeId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Seen in a scan and offered (or about to be offered) to the listener.
    Discovered,
    /// The listener accepted the frame.
    Injected,
}

#[derive(Debug, Clone)]
pub struct FrameObserverOptions {
    pub opt_in_attribute: String,
    pub debounce: DebounceConfig,
    pub ready_poll: Duration,
}

impl Default for FrameObserverOptions {
    fn default() -> Self {
        Self::from(&FramesConfig::default())
    }
}

impl From<&FramesConfig> for FrameObserverOptions {
    fn from(config: &FramesConfig) -> Self {
        Self {
            opt_in_attribute: config.opt_in_attribute.clone(),
            debounce: DebounceConfig::with_millis(config.debounce_ms),
            ready_poll: Duration::from_millis(config.ready_poll_ms.max(1)),
        }
    }
}

struct Shared {
    document: Document,
    root: NodeId,
    origin: String,
    listener: Arc<dyn FrameListener>,
    options: FrameObserverOptions,
    frames: Mutex<HashMap<NodeId, FrameState>>,
    disconnected: AtomicBool,
}

impl Shared {
    fn frames(&self) -> MutexGuard<'_, HashMap<NodeId, FrameState>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn is_tracked(&self, element: NodeId) -> bool {
        self.frames().contains_key(&element)
    }

    /// Reconcile the tracked set with the frames currently present.
    fn discover(self: &Arc<Self>) {
        if self.is_disconnected() {
            return;
        }
        let present =
            self.document.query_all_with_attribute(self.root, "iframe", &self.options.opt_in_attribute);

        let (added, removed) = {
            let mut frames = self.frames();
            let added: Vec<NodeId> =
                present.iter().copied().filter(|element| !frames.contains_key(element)).collect();
            let removed: Vec<NodeId> =
                frames.keys().copied().filter(|element| !present.contains(element)).collect();
            for element in &added {
                frames.insert(*element, FrameState::Discovered);
            }
            for element in &removed {
                frames.remove(element);
            }
            (added, removed)
        };

        for element in removed {
            debug!(%element, "annotatable frame removed");
            self.listener.frame_removed(element);
        }
        for element in added {
            debug!(%element, "annotatable frame discovered");
            tokio::spawn(Arc::clone(self).offer(element));
        }
    }

    async fn offer(self: Arc<Self>, element: NodeId) {
        let ready = ready::wait_for_frame(
            &self.document,
            element,
            &self.origin,
            self.options.ready_poll,
            || self.is_disconnected() || !self.is_tracked(element),
        )
        .await;

        let window = match ready {
            Ok(Some(window)) => window,
            Ok(None) => return,
            Err(error) => {
                warn!(%element, %error, "unable to inject client into frame");
                return;
            }
        };
        if self.is_disconnected() {
            return;
        }

        let frame = AnnotatableFrame { element, window };
        match self.listener.frame_added(&frame) {
            Ok(()) => {
                if let Some(state) = self.frames().get_mut(&element) {
                    *state = FrameState::Injected;
                }
            }
            Err(error) => warn!(%element, error = %format!("{error:#}"), "frame listener failed"),
        }
    }
}

/// Watches a subtree for annotatable iframes. Dropping the observer
/// disconnects it.
pub struct FrameObserver {
    shared: Arc<Shared>,
    watcher: JoinHandle<()>,
}

impl FrameObserver {
    /// Scan `root` in `host`'s document and keep watching it. Frames present
    /// now are offered to `listener` from spawned tasks, never from this call.
    /// Must run inside a tokio runtime.
    pub fn new(
        host: &Window,
        root: NodeId,
        listener: Arc<dyn FrameListener>,
        options: FrameObserverOptions,
    ) -> Result<Self, FrameAccessError> {
        let document = host.document().ok_or(FrameAccessError::NoDocument)?;
        let mutations = document.observe(
            root,
            ObserveOptions::child_list_subtree().with_attribute_filter([&options.opt_in_attribute]),
        );

        let shared = Arc::new(Shared {
            document,
            root,
            origin: host.origin().to_string(),
            listener,
            options,
            frames: Mutex::new(HashMap::new()),
            disconnected: AtomicBool::new(false),
        });
        shared.discover();

        let watcher = tokio::spawn(watch(Arc::clone(&shared), mutations));
        Ok(Self { shared, watcher })
    }

    /// Stop observing. The listener is not invoked again, including for
    /// readiness waits already in flight.
    pub fn disconnect(&self) {
        if !self.shared.disconnected.swap(true, Ordering::SeqCst) {
            self.watcher.abort();
            debug!("frame observer disconnected");
        }
    }

    pub fn frame_state(&self, element: NodeId) -> Option<FrameState> {
        self.shared.frames().get(&element).copied()
    }

    /// Tracked frames in node order.
    pub fn tracked_frames(&self) -> Vec<NodeId> {
        let mut frames: Vec<NodeId> = self.shared.frames().keys().copied().collect();
        frames.sort();
        frames
    }
}

impl Drop for FrameObserver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn watch(shared: Arc<Shared>, mut mutations: MutationReceiver) {
    let mut debouncer = Debouncer::new(shared.options.debounce);
    loop {
        let deadline = debouncer.next_deadline();
        let wake = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            record = mutations.recv() => match record {
                Some(record) => {
                    trace!(?record, "frame observer saw mutation");
                    debouncer.push();
                }
                None => break,
            },
            _ = sleep_until(wake), if deadline.is_some() => {
                if let Some(burst) = debouncer.drain_ready() {
                    trace!(mutations = burst, "re-scanning for annotatable frames");
                    shared.discover();
                }
            }
        }
    }
}
