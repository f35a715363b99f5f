use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use annotator_bridge::dom::{Document, NodeId};
use annotator_bridge::frames::{
    AnnotatableFrame, FrameInjector, FrameListener, FrameObserver, FrameObserverOptions, FrameState,
};
use annotator_bridge::window::{ReadyState, Window};
use serde_json::Map;
use tokio::sync::mpsc;

const HOST_URL: &str = "https://host.example/article";

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Added(NodeId),
    Removed(NodeId),
}

struct Recorder {
    events: mpsc::UnboundedSender<Event>,
    calls: AtomicUsize,
    fail: bool,
}

impl Recorder {
    fn new(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { events, calls: AtomicUsize::new(0), fail }), receiver)
    }
}

impl FrameListener for Recorder {
    fn frame_added(&self, frame: &AnnotatableFrame) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(Event::Added(frame.element));
        if self.fail {
            anyhow::bail!("injection refused");
        }
        Ok(())
    }

    fn frame_removed(&self, element: NodeId) {
        let _ = self.events.send(Event::Removed(element));
    }
}

fn host() -> (Window, Document, NodeId) {
    let window = Window::new(HOST_URL).expect("host url should parse");
    let document = window.document().expect("new window should have a document");
    let body = document.append_element(document.root(), "body").expect("append body");
    (window, document, body)
}

fn add_frame(document: &Document, parent: NodeId, url: &str) -> (NodeId, Window) {
    let window = Window::new(url).expect("frame url should parse");
    let frame = document.create_element("iframe");
    document.set_attribute(frame, "enable-annotation", "").expect("set opt-in attribute");
    document.set_content_window(frame, window.clone()).expect("attach content window");
    document.append_child(parent, frame).expect("attach frame");
    (frame, window)
}

// ── Initial scan ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn initial_frames_are_offered_asynchronously() {
    let (window, document, body) = host();
    let (frame, _) = add_frame(&document, body, "https://host.example/child");
    let plain = document.append_element(body, "iframe").expect("append plain iframe");

    let (recorder, mut events) = Recorder::new(false);
    let observer =
        FrameObserver::new(&window, body, recorder.clone(), FrameObserverOptions::default())
            .expect("host has a document");

    assert!(events.try_recv().is_err(), "listener must not run during construction");
    assert_eq!(observer.tracked_frames(), vec![frame]);

    assert_eq!(events.recv().await, Some(Event::Added(frame)));
    assert_eq!(observer.frame_state(frame), Some(FrameState::Injected));
    assert_eq!(observer.frame_state(plain), None);
}

// ── Mutations ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn added_frames_are_discovered_after_debounce() {
    let (window, document, body) = host();
    let (recorder, mut events) = Recorder::new(false);
    let observer =
        FrameObserver::new(&window, body, recorder.clone(), FrameObserverOptions::default())
            .expect("host has a document");

    let (frame, _) = add_frame(&document, body, "https://host.example/late");
    for _ in 0..5 {
        document.append_element(body, "div").expect("append filler");
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(events.try_recv().is_err(), "re-scan must wait for the debounce window");

    assert_eq!(events.recv().await, Some(Event::Added(frame)));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(observer.tracked_frames(), vec![frame]);
}

#[tokio::test(start_paused = true)]
async fn opt_in_attribute_toggles_tracking() {
    let (window, document, body) = host();
    let (recorder, mut events) = Recorder::new(false);
    let observer =
        FrameObserver::new(&window, body, recorder.clone(), FrameObserverOptions::default())
            .expect("host has a document");

    let frame = document.append_element(body, "iframe").expect("append iframe");
    document
        .set_content_window(frame, Window::new("https://host.example/x").expect("url"))
        .expect("attach window");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());

    document.set_attribute(frame, "enable-annotation", "").expect("opt in");
    assert_eq!(events.recv().await, Some(Event::Added(frame)));

    document.remove_attribute(frame, "enable-annotation").expect("opt out");
    assert_eq!(events.recv().await, Some(Event::Removed(frame)));
    assert!(observer.tracked_frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn removed_frames_are_rediscovered_when_reattached() {
    let (window, document, body) = host();
    let (frame, _) = add_frame(&document, body, "https://host.example/child");
    let (recorder, mut events) = Recorder::new(false);
    let observer =
        FrameObserver::new(&window, body, recorder.clone(), FrameObserverOptions::default())
            .expect("host has a document");
    assert_eq!(events.recv().await, Some(Event::Added(frame)));

    document.remove(frame).expect("detach frame");
    assert_eq!(events.recv().await, Some(Event::Removed(frame)));
    assert_eq!(observer.frame_state(frame), None);

    document.append_child(body, frame).expect("reattach frame");
    assert_eq!(events.recv().await, Some(Event::Added(frame)));
}

// ── Failures ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn listener_failures_are_not_retried() {
    let (window, document, body) = host();
    let (frame, _) = add_frame(&document, body, "https://host.example/child");
    let (recorder, mut events) = Recorder::new(true);
    let observer =
        FrameObserver::new(&window, body, recorder.clone(), FrameObserverOptions::default())
            .expect("host has a document");

    assert_eq!(events.recv().await, Some(Event::Added(frame)));
    document.append_element(body, "div").expect("trigger re-scan");
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(observer.frame_state(frame), Some(FrameState::Discovered));
}

#[tokio::test(start_paused = true)]
async fn cross_origin_frames_are_tracked_but_not_offered() {
    let (window, document, body) = host();
    let (frame, _) = add_frame(&document, body, "https://elsewhere.example/embed");
    let (recorder, _events) = Recorder::new(false);
    let observer =
        FrameObserver::new(&window, body, recorder.clone(), FrameObserverOptions::default())
            .expect("host has a document");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(observer.frame_state(frame), Some(FrameState::Discovered));
}

// ── Disconnect ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_readiness_waits() {
    let (window, document, body) = host();
    let (frame, frame_window) = add_frame(&document, body, "https://host.example/slow");
    frame_window.set_ready_state(ReadyState::Loading);

    let (recorder, mut events) = Recorder::new(false);
    let observer =
        FrameObserver::new(&window, body, recorder.clone(), FrameObserverOptions::default())
            .expect("host has a document");
    tokio::time::sleep(Duration::from_millis(120)).await;
    observer.disconnect();

    frame_window.set_ready_state(ReadyState::Complete);
    add_frame(&document, body, "https://host.example/after");
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(events.try_recv().is_err());
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(observer.frame_state(frame), Some(FrameState::Discovered));
}

#[tokio::test(start_paused = true)]
async fn disconnect_discards_a_scan_still_in_its_debounce_window() {
    let (window, document, body) = host();
    let (recorder, mut events) = Recorder::new(false);
    let observer =
        FrameObserver::new(&window, body, recorder.clone(), FrameObserverOptions::default())
            .expect("host has a document");
    tokio::time::sleep(Duration::from_millis(10)).await;

    add_frame(&document, body, "https://host.example/late");
    tokio::time::sleep(Duration::from_millis(20)).await;
    observer.disconnect();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    assert!(observer.tracked_frames().is_empty());
}

// ── Injector ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn injector_loads_client_into_discovered_frames() {
    let (window, document, body) = host();
    let (frame, frame_window) = add_frame(&document, body, "https://host.example/child");
    let injector = Arc::new(FrameInjector::new(window.origin(), Map::new()));
    let observer =
        FrameObserver::new(&window, body, injector.clone(), FrameObserverOptions::default())
            .expect("host has a document");

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(observer.frame_state(frame), Some(FrameState::Injected));
    let injected = injector.injected_frame(frame).expect("frame should be injected");
    assert!(injected.config["subFrameIdentifier"].is_string());

    let frame_document = frame_window.document().expect("frame document");
    assert!(annotator_bridge::frames::injector::hosts_client(&frame_document));
}
