// In-process DOM: an arena of element and text nodes behind a cloneable
// handle, with mutation observation for child-list and attribute changes.
//
// Iframe elements may carry a content `Window`; see `crate::window`.

pub mod mutation;
pub mod range;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

use crate::window::Window;

pub use mutation::{MutationReceiver, MutationRecord, ObserveOptions};
pub use range::{Boundary, TextRange};

/// Handle to a node within one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0} does not exist in this document")]
    UnknownNode(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} is not a text node")]
    NotAText(NodeId),

    #[error("cannot insert {child} under {parent}: it would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

#[derive(Debug)]
enum NodeData {
    Element { tag: String, attributes: BTreeMap<String, String> },
    Text(String),
}

struct NodeRecord {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    content_window: Option<Window>,
}

struct Registration {
    target: NodeId,
    options: ObserveOptions,
    sender: mpsc::UnboundedSender<MutationRecord>,
}

struct DocumentInner {
    nodes: Vec<NodeRecord>,
    root: NodeId,
    observers: Vec<Registration>,
}

/// Shared handle to a document tree. Clones refer to the same document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<DocumentInner>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Document").field("nodes", &inner.nodes.len()).finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document whose root is an `html` element.
    pub fn new() -> Self {
        let root = NodeRecord {
            data: NodeData::Element { tag: "html".to_string(), attributes: BTreeMap::new() },
            parent: None,
            children: Vec::new(),
            content_window: None,
        };
        Self {
            inner: Arc::new(Mutex::new(DocumentInner {
                nodes: vec![root],
                root: NodeId(0),
                observers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DocumentInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn root(&self) -> NodeId {
        self.lock().root
    }

    pub fn same_document(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Construction ───────────────────────────────────────────────

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.lock().push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&self, data: &str) -> NodeId {
        self.lock().push(NodeData::Text(data.to_string()))
    }

    /// Create an element and append it to `parent`.
    pub fn append_element(&self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        let element = self.create_element(tag);
        self.append_child(parent, element)?;
        Ok(element)
    }

    /// Create a text node and append it to `parent`.
    pub fn append_text(&self, parent: NodeId, data: &str) -> Result<NodeId, DomError> {
        let text = self.create_text(data);
        self.append_child(parent, text)?;
        Ok(text)
    }

    // ── Tree mutation ──────────────────────────────────────────────

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is `None`. A child that is already attached elsewhere is
    /// moved.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let mut inner = self.lock();
        inner.element(parent)?;
        inner.node(child)?;
        if inner.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference {
            if inner.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild { parent, child: reference });
            }
        }

        if let Some(old_parent) = inner.nodes[child.0].parent {
            inner.detach(old_parent, child);
            inner.notify(MutationRecord::ChildList {
                target: old_parent,
                added: Vec::new(),
                removed: vec![child],
            });
        }

        let position = match reference {
            Some(reference) => inner.nodes[parent.0]
                .children
                .iter()
                .position(|&c| c == reference)
                .unwrap_or(inner.nodes[parent.0].children.len()),
            None => inner.nodes[parent.0].children.len(),
        };
        inner.nodes[parent.0].children.insert(position, child);
        inner.nodes[child.0].parent = Some(parent);
        inner.notify(MutationRecord::ChildList { target: parent, added: vec![child], removed: Vec::new() });
        Ok(())
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.lock();
        inner.node(parent)?;
        if inner.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        inner.detach(parent, child);
        inner.notify(MutationRecord::ChildList { target: parent, added: Vec::new(), removed: vec![child] });
        Ok(())
    }

    /// Detach `node` from its parent, if it has one.
    pub fn remove(&self, node: NodeId) -> Result<(), DomError> {
        let parent = self.lock().node(node)?.parent;
        match parent {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut inner = self.lock();
        let attributes = inner.attributes_mut(element)?;
        let name = name.to_ascii_lowercase();
        let changed = attributes.get(&name).map(String::as_str) != Some(value);
        attributes.insert(name.clone(), value.to_string());
        if changed {
            inner.notify(MutationRecord::Attribute { target: element, name });
        }
        Ok(())
    }

    pub fn remove_attribute(&self, element: NodeId, name: &str) -> Result<(), DomError> {
        let mut inner = self.lock();
        let name = name.to_ascii_lowercase();
        if inner.attributes_mut(element)?.remove(&name).is_some() {
            inner.notify(MutationRecord::Attribute { target: element, name });
        }
        Ok(())
    }

    /// Replace the content of a text node.
    pub fn set_text(&self, text: NodeId, data: &str) -> Result<(), DomError> {
        let mut inner = self.lock();
        match &mut inner.node_mut(text)?.data {
            NodeData::Text(current) => {
                *current = data.to_string();
                Ok(())
            }
            NodeData::Element { .. } => Err(DomError::NotAText(text)),
        }
    }

    /// Attach the browsing context displayed by an iframe element.
    pub fn set_content_window(&self, element: NodeId, window: Window) -> Result<(), DomError> {
        let mut inner = self.lock();
        inner.element(element)?;
        inner.nodes[element.0].content_window = Some(window);
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────

    pub fn content_window(&self, element: NodeId) -> Option<Window> {
        self.lock().nodes.get(element.0).and_then(|node| node.content_window.clone())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.lock().nodes.get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.lock().nodes.get(node.0).map(|n| n.children.clone()).unwrap_or_default()
    }

    /// Lowercase tag name, or `None` for text nodes and unknown ids.
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.lock().nodes.get(node.0)?.data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.lock().nodes.get(node.0).map(|n| &n.data), Some(NodeData::Element { .. }))
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.lock().nodes.get(node.0).map(|n| &n.data), Some(NodeData::Text(_)))
    }

    /// Content of a text node.
    pub fn text_data(&self, node: NodeId) -> Option<String> {
        match &self.lock().nodes.get(node.0)?.data {
            NodeData::Text(data) => Some(data.clone()),
            NodeData::Element { .. } => None,
        }
    }

    pub fn attribute(&self, element: NodeId, name: &str) -> Option<String> {
        match &self.lock().nodes.get(element.0)?.data {
            NodeData::Element { attributes, .. } => {
                attributes.get(&name.to_ascii_lowercase()).cloned()
            }
            NodeData::Text(_) => None,
        }
    }

    pub fn has_attribute(&self, element: NodeId, name: &str) -> bool {
        self.attribute(element, name).is_some()
    }

    /// True when `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.lock().is_inclusive_ancestor(ancestor, node)
    }

    /// True when `node` is attached to the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let inner = self.lock();
        inner.is_inclusive_ancestor(inner.root, node)
    }

    /// Concatenated content of every text node beneath `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        let inner = self.lock();
        let mut out = String::new();
        for id in inner.text_nodes(node) {
            if let NodeData::Text(data) = &inner.nodes[id.0].data {
                out.push_str(data);
            }
        }
        out
    }

    /// Text nodes beneath `node` in document order, with their length in
    /// characters.
    pub fn text_nodes(&self, node: NodeId) -> Vec<(NodeId, usize)> {
        let inner = self.lock();
        inner
            .text_nodes(node)
            .into_iter()
            .map(|id| match &inner.nodes[id.0].data {
                NodeData::Text(data) => (id, data.chars().count()),
                NodeData::Element { .. } => (id, 0),
            })
            .collect()
    }

    /// Descendants of `root` (excluding `root`) with the given tag, in
    /// document order.
    pub fn elements_by_tag_name(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.query(root, tag, None)
    }

    /// Descendants of `root` (excluding `root`) with the given tag that carry
    /// `attribute`, in document order.
    pub fn query_all_with_attribute(&self, root: NodeId, tag: &str, attribute: &str) -> Vec<NodeId> {
        self.query(root, tag, Some(attribute))
    }

    fn query(&self, root: NodeId, tag: &str, attribute: Option<&str>) -> Vec<NodeId> {
        let inner = self.lock();
        let tag = tag.to_ascii_lowercase();
        let attribute = attribute.map(str::to_ascii_lowercase);
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = inner
            .nodes
            .get(root.0)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(id) = stack.pop() {
            let node = &inner.nodes[id.0];
            if let NodeData::Element { tag: node_tag, attributes } = &node.data {
                let has_attribute =
                    attribute.as_ref().map_or(true, |name| attributes.contains_key(name));
                if *node_tag == tag && has_attribute {
                    found.push(id);
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /// Start observing mutations at `target`. Dropping the receiver stops
    /// observation.
    pub fn observe(&self, target: NodeId, options: ObserveOptions) -> MutationReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().observers.push(Registration { target, options, sender });
        MutationReceiver::new(receiver)
    }
}

impl DocumentInner {
    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeRecord { data, parent: None, children: Vec::new(), content_window: None });
        id
    }

    fn node(&self, id: NodeId) -> Result<&NodeRecord, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn element(&self, id: NodeId) -> Result<&NodeRecord, DomError> {
        let node = self.node(id)?;
        match node.data {
            NodeData::Element { .. } => Ok(node),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn attributes_mut(&mut self, id: NodeId) -> Result<&mut BTreeMap<String, String>, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.retain(|&c| c != child);
        self.nodes[child.0].parent = None;
    }

    fn text_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(record) = self.nodes.get(id.0) else { continue };
            match record.data {
                NodeData::Text(_) => found.push(id),
                NodeData::Element { .. } => stack.extend(record.children.iter().rev().copied()),
            }
        }
        found
    }

    fn notify(&mut self, record: MutationRecord) {
        let target = record.target();
        let mut delivered = 0usize;
        let nodes = &self.nodes;
        let is_within = |observed: NodeId| {
            let mut current = Some(target);
            while let Some(id) = current {
                if id == observed {
                    return true;
                }
                current = nodes.get(id.0).and_then(|n| n.parent);
            }
            false
        };

        self.observers.retain(|registration| {
            if registration.sender.is_closed() {
                return false;
            }
            let in_scope = if registration.options.subtree {
                is_within(registration.target)
            } else {
                registration.target == target
            };
            if in_scope && registration.options.wants(&record) {
                delivered += 1;
                return registration.sender.send(record.clone()).is_ok();
            }
            true
        });

        trace!(?record, delivered, "dom mutation");
    }
}
