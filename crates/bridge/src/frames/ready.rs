// Waiting for a discovered frame to be worth injecting into.

use std::time::Duration;

use tokio::time::sleep;

use crate::dom::{Document, NodeId};
use crate::window::{FrameAccessError, ReadyState, Window};

const BLANK_URL: &str = "about:blank";

/// True when `window` shows a loaded document rather than the transient
/// blank document an iframe holds before its `src` navigation commits.
pub fn is_frame_ready(document: &Document, element: NodeId, window: &Window) -> bool {
    if window.ready_state() == ReadyState::Loading {
        return false;
    }
    let pending_navigation = document
        .attribute(element, "src")
        .is_some_and(|src| !src.is_empty() && src != BLANK_URL);
    !(pending_navigation && window.url() == BLANK_URL)
}

/// Poll until the frame at `element` has a ready, accessible document.
///
/// Returns `Ok(None)` as soon as `abandoned` reports true. Cross-origin
/// frames fail immediately.
pub async fn wait_for_frame<F>(
    document: &Document,
    element: NodeId,
    accessor_origin: &str,
    poll: Duration,
    abandoned: F,
) -> Result<Option<Window>, FrameAccessError>
where
    F: Fn() -> bool,
{
    loop {
        if abandoned() {
            return Ok(None);
        }
        if let Some(window) = document.content_window(element) {
            window.content_document(accessor_origin)?;
            if is_frame_ready(document, element, &window) {
                return Ok(Some(window));
            }
        }
        sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    const ORIGIN: &str = "https://host.example";

    fn frame_with(window: Window) -> (Document, NodeId) {
        let doc = Document::new();
        let frame = doc.create_element("iframe");
        doc.set_content_window(frame, window).unwrap();
        doc.append_child(doc.root(), frame).unwrap();
        (doc, frame)
    }

    #[tokio::test]
    async fn loaded_same_origin_frame_is_ready() {
        let window = Window::new("https://host.example/child").unwrap();
        let (doc, frame) = frame_with(window.clone());
        let ready = wait_for_frame(&doc, frame, ORIGIN, Duration::from_millis(5), || false).await;
        assert_eq!(ready.unwrap(), Some(window));
    }

    #[tokio::test]
    async fn cross_origin_frame_fails() {
        let (doc, frame) = frame_with(Window::new("https://other.example/").unwrap());
        let ready = wait_for_frame(&doc, frame, ORIGIN, Duration::from_millis(5), || false).await;
        assert!(matches!(ready, Err(FrameAccessError::CrossOrigin { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_loading_frame() {
        let window = Window::new("https://host.example/child").unwrap();
        window.set_ready_state(ReadyState::Loading);
        let (doc, frame) = frame_with(window.clone());

        let waiter = tokio::spawn(async move {
            wait_for_frame(&doc, frame, ORIGIN, Duration::from_millis(50), || false).await
        });
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!waiter.is_finished());

        window.set_ready_state(ReadyState::Complete);
        let ready = waiter.await.expect("waiter should not panic");
        assert_eq!(ready.unwrap(), Some(window));
    }

    #[test]
    fn blank_document_before_navigation_is_not_ready() {
        let blank = Window::about_blank(ORIGIN);
        let (doc, frame) = frame_with(blank.clone());
        assert!(is_frame_ready(&doc, frame, &blank));
        doc.set_attribute(frame, "src", "https://host.example/page").unwrap();
        assert!(!is_frame_ready(&doc, frame, &blank));
    }

    #[tokio::test]
    async fn abandoned_wait_returns_none() {
        let doc = Document::new();
        let frame = doc.append_element(doc.root(), "iframe").unwrap();
        let abandoned = AtomicBool::new(true);
        let ready = wait_for_frame(&doc, frame, ORIGIN, Duration::from_millis(5), || {
            abandoned.load(Ordering::SeqCst)
        })
        .await;
        assert_eq!(ready.unwrap(), None);
    }
}
