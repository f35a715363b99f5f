// Location change notifications.
//
// The platform hook reports every navigation it sees (history pushes,
// replacements, hash changes); subscribers only hear about actual changes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChange {
    pub url: String,
    pub previous: String,
}

#[derive(Debug)]
pub struct LocationWatcher {
    current: Mutex<String>,
    sender: broadcast::Sender<LocationChange>,
}

impl LocationWatcher {
    pub fn new(initial_url: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { current: Mutex::new(initial_url.into()), sender }
    }

    fn current_url(&self) -> MutexGuard<'_, String> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn url(&self) -> String {
        self.current_url().clone()
    }

    /// Subscribe to changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<LocationChange> {
        self.sender.subscribe()
    }

    /// Report a navigation to `url`. Returns true if it changed the location.
    pub fn navigated(&self, url: &str) -> bool {
        let change = {
            let mut current = self.current_url();
            if *current == url {
                return false;
            }
            let previous = std::mem::replace(&mut *current, url.to_string());
            LocationChange { url: url.to_string(), previous }
        };
        debug!(url = %change.url, previous = %change.previous, "location changed");
        // No subscribers is not an error.
        let _ = self.sender.send(change);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_changes() {
        let watcher = LocationWatcher::new("https://a.example/one");
        let mut changes = watcher.subscribe();

        assert!(watcher.navigated("https://a.example/two"));
        let change = changes.recv().await.unwrap();
        assert_eq!(change.url, "https://a.example/two");
        assert_eq!(change.previous, "https://a.example/one");
        assert_eq!(watcher.url(), "https://a.example/two");
    }

    #[test]
    fn duplicate_navigation_is_suppressed() {
        let watcher = LocationWatcher::new("https://a.example/one");
        let mut changes = watcher.subscribe();
        assert!(!watcher.navigated("https://a.example/one"));
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn navigation_without_subscribers_is_fine() {
        let watcher = LocationWatcher::new("https://a.example/");
        assert!(watcher.navigated("https://a.example/#section"));
    }
}
