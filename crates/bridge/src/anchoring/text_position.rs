// Conversions between tree boundaries and character offsets into the text
// content of an element.

use annotator_common::selector::TextPositionSelector;

use crate::dom::{Boundary, Document, NodeId, TextRange};

use super::SelectorError;

/// Which text node wins when an offset falls between two of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Prefer the start of the following node (range starts).
    Forward,
    /// Prefer the end of the preceding node (range ends).
    Backward,
}

/// Character offset of `boundary` within the text content of `element`.
pub fn offset_within(
    document: &Document,
    element: NodeId,
    boundary: Boundary,
) -> Result<usize, SelectorError> {
    if !document.contains(element, boundary.node) {
        return Err(SelectorError::NotInRoot(boundary.node));
    }
    let size = match document.text_data(boundary.node) {
        Some(data) => data.chars().count(),
        None => document.children(boundary.node).len(),
    };
    if boundary.offset > size {
        return Err(SelectorError::InvalidBoundary { node: boundary.node, offset: boundary.offset });
    }

    let mut offset = 0;
    text_before(document, element, boundary, &mut offset);
    Ok(offset)
}

/// Preorder walk adding up text until `boundary` is reached. Returns true
/// once it has been found.
fn text_before(document: &Document, node: NodeId, boundary: Boundary, offset: &mut usize) -> bool {
    if node == boundary.node {
        match document.text_data(node) {
            Some(_) => *offset += boundary.offset,
            None => {
                for child in document.children(node).into_iter().take(boundary.offset) {
                    *offset += document.text_content(child).chars().count();
                }
            }
        }
        return true;
    }
    if let Some(data) = document.text_data(node) {
        *offset += data.chars().count();
        return false;
    }
    document.children(node).into_iter().any(|child| text_before(document, child, boundary, offset))
}

/// Resolve a character offset in the text content of `element` to a text
/// boundary. An element without text resolves offset 0 to itself.
pub fn resolve_offset(
    document: &Document,
    element: NodeId,
    offset: usize,
    bias: Bias,
) -> Result<Boundary, SelectorError> {
    let text_nodes = document.text_nodes(element);
    let length: usize = text_nodes.iter().map(|(_, len)| len).sum();
    if offset > length {
        return Err(SelectorError::OffsetOutOfRange { offset, length });
    }
    let Some(&(last, last_len)) = text_nodes.last() else {
        return Ok(Boundary::new(element, 0));
    };

    let mut seen = 0;
    for (node, len) in text_nodes {
        let hit = match bias {
            Bias::Forward => seen + len > offset,
            Bias::Backward => offset == 0 || (seen < offset && offset <= seen + len),
        };
        if hit {
            return Ok(Boundary::new(node, offset - seen));
        }
        seen += len;
    }
    Ok(Boundary::new(last, last_len))
}

/// Describe `range` as character offsets into the text content of `root`.
pub fn range_to_text_position(
    document: &Document,
    root: NodeId,
    range: &TextRange,
) -> Result<TextPositionSelector, SelectorError> {
    let start = offset_within(document, root, range.start)?;
    let end = offset_within(document, root, range.end)?;
    if start > end {
        return Err(SelectorError::Inverted);
    }
    Ok(TextPositionSelector { start, end })
}

/// Resolve character offsets into the text content of `root` to a range.
pub fn text_position_to_range(
    document: &Document,
    root: NodeId,
    selector: &TextPositionSelector,
) -> Result<TextRange, SelectorError> {
    if selector.start > selector.end {
        return Err(SelectorError::Inverted);
    }
    Ok(TextRange::new(
        resolve_offset(document, root, selector.start, Bias::Forward)?,
        resolve_offset(document, root, selector.end, Bias::Backward)?,
    ))
}

/// The text covered by `range`, measured within `root`.
pub fn range_text(document: &Document, root: NodeId, range: &TextRange) -> Result<String, SelectorError> {
    let position = range_to_text_position(document, root, range)?;
    Ok(document
        .text_content(root)
        .chars()
        .skip(position.start)
        .take(position.end - position.start)
        .collect())
}
