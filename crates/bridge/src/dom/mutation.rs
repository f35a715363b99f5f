use tokio::sync::mpsc;

use super::NodeId;

/// A single observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    ChildList { target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId> },
    Attribute { target: NodeId, name: String },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            Self::ChildList { target, .. } | Self::Attribute { target, .. } => *target,
        }
    }
}

/// What an observer registration reports.
#[derive(Debug, Clone, Default)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    /// Attribute names to report; `None` reports no attribute changes.
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    pub fn child_list_subtree() -> Self {
        Self { child_list: true, subtree: true, attribute_filter: None }
    }

    pub fn with_attribute_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attribute_filter =
            Some(names.into_iter().map(|n| n.as_ref().to_ascii_lowercase()).collect());
        self
    }

    pub(crate) fn wants(&self, record: &MutationRecord) -> bool {
        match record {
            MutationRecord::ChildList { .. } => self.child_list,
            MutationRecord::Attribute { name, .. } => {
                self.attribute_filter.as_ref().is_some_and(|filter| filter.iter().any(|n| n == name))
            }
        }
    }
}

/// Receiving side of an observer registration.
#[derive(Debug)]
pub struct MutationReceiver {
    receiver: mpsc::UnboundedReceiver<MutationRecord>,
}

impl MutationReceiver {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<MutationRecord>) -> Self {
        Self { receiver }
    }

    pub async fn recv(&mut self) -> Option<MutationRecord> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<MutationRecord> {
        self.receiver.try_recv().ok()
    }
}
