// Document-type integrations.
//
// An integration knows how to anchor selectors in one kind of document and
// how to describe regions of it. Which one applies is decided from
// environment signals alone.

pub mod html;
pub mod pdf;

use annotator_common::anchoring::anchor_quote;
use annotator_common::selector::{Selector, TextPositionSelector, TextQuoteSelector};
use serde::Serialize;
use thiserror::Error;

use crate::anchoring::SelectorError;
use crate::dom::{Document, TextRange};

pub use html::HtmlIntegration;
pub use pdf::PdfIntegration;

/// Attribute a PDF viewer places on its container element.
pub const PDF_VIEWER_ATTRIBUTE: &str = "data-pdf-viewer";

#[derive(Debug, Error, PartialEq)]
pub enum IntegrationError {
    #[error("integration has been destroyed")]
    Destroyed,

    #[error("window has no document")]
    NoDocument,

    #[error("no selector could be anchored")]
    NotFound,

    #[error("cannot describe an empty region")]
    EmptyRegion,

    #[error("region does not belong to this integration")]
    ForeignRegion,

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    Html,
    Pdf,
}

/// What is known about the hosting environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSignals {
    /// A PDF viewer application is present.
    pub pdf_viewer: bool,
    /// Content type of the top-level resource, if known.
    pub content_type: Option<String>,
}

impl EnvironmentSignals {
    /// Collect signals from a document.
    pub fn probe(document: &Document) -> Self {
        let pdf_viewer =
            !document.query_all_with_attribute(document.root(), "div", PDF_VIEWER_ATTRIBUTE).is_empty();
        Self { pdf_viewer, content_type: None }
    }
}

/// Pick the integration for an environment.
pub fn select_integration(signals: &EnvironmentSignals) -> IntegrationKind {
    let pdf_content = signals
        .content_type
        .as_deref()
        .is_some_and(|content_type| content_type.eq_ignore_ascii_case("application/pdf"));
    if signals.pdf_viewer || pdf_content {
        IntegrationKind::Pdf
    } else {
        IntegrationKind::Html
    }
}

/// A located part of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// A live range in an HTML document.
    Range(TextRange),
    /// Character offsets into the concatenated page text of a PDF.
    Pdf { page: usize, start: usize, end: usize },
}

/// The result of anchoring a set of selectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub region: Region,
    /// Text currently covered by the region.
    pub exact: String,
    /// 1.0 for positional anchors, the match score for fuzzy quote anchors.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
}

/// Capabilities shared by all integrations.
pub trait Integration: Send + Sync {
    fn kind(&self) -> IntegrationKind;

    /// Locate the region described by `selectors`.
    fn anchor(&self, selectors: &[Selector]) -> Result<Anchor, IntegrationError>;

    /// Selectors describing `region`.
    fn describe(&self, region: &Region) -> Result<Vec<Selector>, IntegrationError>;

    fn scroll_to_anchor(&self, anchor: &Anchor) -> Result<(), IntegrationError>;

    fn get_metadata(&self) -> DocumentMetadata;

    /// Release the integration. Later calls fail with
    /// [`IntegrationError::Destroyed`].
    fn destroy(&self);
}

pub(crate) fn quote_selector(selectors: &[Selector]) -> Option<&TextQuoteSelector> {
    selectors.iter().find_map(|selector| match selector {
        Selector::TextQuote(quote) => Some(quote),
        _ => None,
    })
}

pub(crate) fn position_selector(selectors: &[Selector]) -> Option<&TextPositionSelector> {
    selectors.iter().find_map(|selector| match selector {
        Selector::TextPosition(position) => Some(position),
        _ => None,
    })
}

/// Anchor text selectors in `text`: the position selector wins if the text
/// it covers still equals the quote; otherwise the quote is searched for,
/// biased towards the recorded position.
pub(crate) fn anchor_text_selectors(
    text: &str,
    selectors: &[Selector],
) -> Option<(TextPositionSelector, f64)> {
    let quote = quote_selector(selectors);
    let position = position_selector(selectors);

    if let Some(position) = position {
        if position.start <= position.end && position.end <= text.chars().count() {
            let covered: String =
                text.chars().skip(position.start).take(position.end - position.start).collect();
            if quote.map_or(true, |quote| quote.exact == covered) {
                return Some((*position, 1.0));
            }
        }
    }

    let quote = quote?;
    let (found, matched) = anchor_quote(text, quote, position.map(|p| p.start))?;
    Some((found, matched.score))
}
