// RangeSelector codec: each boundary becomes a structural path to an
// element plus a character offset into that element's text content.

use annotator_common::path::{format_path, parse_path, PathSegment};
use annotator_common::selector::PositionSelector;

use crate::dom::{Boundary, Document, NodeId, TextRange};

use super::text_position::{offset_within, resolve_offset, Bias};
use super::SelectorError;

/// Serialize `range` relative to `root`.
pub fn to_selector(
    document: &Document,
    root: NodeId,
    range: &TextRange,
) -> Result<PositionSelector, SelectorError> {
    let (start_container, start_offset) = describe_boundary(document, root, range.start)?;
    let (end_container, end_offset) = describe_boundary(document, root, range.end)?;
    Ok(PositionSelector { start_container, start_offset, end_container, end_offset })
}

/// Resolve `selector` against `root`. Boundaries land on text nodes: a
/// start that falls between two text nodes resolves to the beginning of the
/// following node, an end to the end of the preceding one.
pub fn from_selector(
    document: &Document,
    root: NodeId,
    selector: &PositionSelector,
) -> Result<TextRange, SelectorError> {
    let start_element = resolve_path(document, root, &selector.start_container)?;
    let end_element = resolve_path(document, root, &selector.end_container)?;
    let start = resolve_offset(document, start_element, non_negative(selector.start_offset)?, Bias::Forward)?;
    let end = resolve_offset(document, end_element, non_negative(selector.end_offset)?, Bias::Backward)?;
    Ok(TextRange::new(start, end))
}

fn describe_boundary(
    document: &Document,
    root: NodeId,
    boundary: Boundary,
) -> Result<(String, i64), SelectorError> {
    if !document.contains(root, boundary.node) {
        return Err(SelectorError::NotInRoot(boundary.node));
    }
    let element = if document.is_text(boundary.node) {
        document.parent(boundary.node).ok_or(SelectorError::NotInRoot(boundary.node))?
    } else {
        boundary.node
    };

    let offset = offset_within(document, element, boundary)?;
    let path = path_from(document, root, element)?;
    let offset = i64::try_from(offset).map_err(|_| SelectorError::InvalidBoundary {
        node: boundary.node,
        offset: boundary.offset,
    })?;
    Ok((path, offset))
}

/// Structural path from `root` down to `element`.
fn path_from(document: &Document, root: NodeId, element: NodeId) -> Result<String, SelectorError> {
    let mut segments = Vec::new();
    let mut current = element;
    while current != root {
        let parent = document.parent(current).ok_or(SelectorError::NotInRoot(element))?;
        let tag = document.tag_name(current).ok_or(SelectorError::NotInRoot(element))?;
        let index = 1 + document
            .children(parent)
            .into_iter()
            .take_while(|&sibling| sibling != current)
            .filter(|&sibling| document.tag_name(sibling).as_deref() == Some(tag.as_str()))
            .count();
        segments.push(PathSegment::new(&tag, index));
        current = parent;
    }
    segments.reverse();
    Ok(format_path(&segments))
}

fn resolve_path(document: &Document, root: NodeId, path: &str) -> Result<NodeId, SelectorError> {
    let mut current = root;
    for segment in parse_path(path)? {
        current = document
            .children(current)
            .into_iter()
            .filter(|&child| document.tag_name(child).as_deref() == Some(segment.tag.as_str()))
            .nth(segment.index - 1)
            .ok_or_else(|| SelectorError::NoSuchNode {
                path: path.to_string(),
                segment: segment.to_string(),
            })?;
    }
    Ok(current)
}

fn non_negative(offset: i64) -> Result<usize, SelectorError> {
    usize::try_from(offset).map_err(|_| SelectorError::NegativeOffset(offset))
}
