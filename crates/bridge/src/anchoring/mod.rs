// DOM-level anchoring: mapping live ranges to serializable selectors and
// back.

pub mod range_selector;
pub mod text_position;

use annotator_common::path::PathError;
use thiserror::Error;

use crate::dom::{DomError, NodeId};

pub use range_selector::{from_selector, to_selector};
pub use text_position::{
    range_text, range_to_text_position, text_position_to_range, Bias,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("node {0} is not inside the anchoring root")]
    NotInRoot(NodeId),

    #[error("boundary offset {offset} exceeds the size of node {node}")]
    InvalidBoundary { node: NodeId, offset: usize },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("path `{path}` does not resolve: no element for `{segment}`")]
    NoSuchNode { path: String, segment: String },

    #[error("negative offset {0}")]
    NegativeOffset(i64),

    #[error("offset {offset} exceeds text length {length}")]
    OffsetOutOfRange { offset: usize, length: usize },

    #[error("range start lies after its end")]
    Inverted,

    #[error(transparent)]
    Dom(#[from] DomError),
}
