// Default frame listener: loads the client into same-origin frames by
// writing a configuration script into the frame document.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dom::{Document, NodeId};

use super::{AnnotatableFrame, FrameListener};

/// Class of the script element carrying the client configuration.
pub const CLIENT_CONFIG_CLASS: &str = "js-annotator-config";

#[derive(Debug, Clone, PartialEq)]
pub struct InjectedFrame {
    pub frame_id: String,
    pub config: Value,
}

#[derive(Debug)]
pub struct FrameInjector {
    origin: String,
    config: Map<String, Value>,
    injected: Mutex<HashMap<NodeId, InjectedFrame>>,
}

impl FrameInjector {
    /// `origin` is the origin of the injecting frame; `config` is the base
    /// configuration handed to each injected client.
    pub fn new(origin: impl Into<String>, config: Map<String, Value>) -> Self {
        Self { origin: origin.into(), config, injected: Mutex::new(HashMap::new()) }
    }

    fn injected(&self) -> MutexGuard<'_, HashMap<NodeId, InjectedFrame>> {
        self.injected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn injected_frame(&self, element: NodeId) -> Option<InjectedFrame> {
        self.injected().get(&element).cloned()
    }

    pub fn injected_count(&self) -> usize {
        self.injected().len()
    }
}

/// True when `document` already carries a client configuration script.
pub fn hosts_client(document: &Document) -> bool {
    document
        .query_all_with_attribute(document.root(), "script", "class")
        .into_iter()
        .any(|script| {
            document
                .attribute(script, "class")
                .is_some_and(|class| class.split_whitespace().any(|c| c == CLIENT_CONFIG_CLASS))
        })
}

impl FrameListener for FrameInjector {
    fn frame_added(&self, frame: &AnnotatableFrame) -> anyhow::Result<()> {
        let document = frame
            .window
            .content_document(&self.origin)
            .context("frame document is not accessible")?;
        if hosts_client(&document) {
            debug!(frame = %frame.element, "frame already hosts the client");
            return Ok(());
        }

        let frame_id = Uuid::new_v4().simple().to_string();
        let mut config = self.config.clone();
        config.insert("subFrameIdentifier".to_string(), Value::String(frame_id.clone()));
        let config = Value::Object(config);

        let root = document.root();
        let head = document
            .children(root)
            .into_iter()
            .find(|&child| document.tag_name(child).as_deref() == Some("head"))
            .unwrap_or(root);
        let script = document.append_element(head, "script")?;
        document.set_attribute(script, "class", CLIENT_CONFIG_CLASS)?;
        document.set_attribute(script, "type", "application/json")?;
        document.append_text(script, &config.to_string())?;

        info!(frame = %frame.element, %frame_id, url = %frame.window.url(), "injected client into frame");
        self.injected().insert(frame.element, InjectedFrame { frame_id, config });
        Ok(())
    }

    fn frame_removed(&self, element: NodeId) {
        if self.injected().remove(&element).is_some() {
            debug!(frame = %element, "injected frame removed");
        }
    }
}
