use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use annotator_common::anchoring::describe_quote;
use annotator_common::selector::{Selector, TextPositionSelector};
use tracing::debug;

use crate::anchoring::{
    from_selector, range_text, range_to_text_position, text_position_to_range, to_selector,
};
use crate::dom::{Document, NodeId, TextRange};
use crate::window::Window;

use super::{
    anchor_text_selectors, quote_selector, Anchor, DocumentMetadata, Integration, IntegrationError,
    IntegrationKind, Region,
};

/// Anchoring in an HTML document below a root element.
pub struct HtmlIntegration {
    window: Window,
    document: Document,
    root: NodeId,
    context_len: usize,
    destroyed: AtomicBool,
    scroll_target: Mutex<Option<TextRange>>,
}

impl HtmlIntegration {
    /// Anchor below the window's `body` element, or the document root when
    /// there is none.
    pub fn new(window: Window, context_len: usize) -> Result<Self, IntegrationError> {
        let document = window.document().ok_or(IntegrationError::NoDocument)?;
        let root = document
            .elements_by_tag_name(document.root(), "body")
            .first()
            .copied()
            .unwrap_or_else(|| document.root());
        Ok(Self {
            window,
            document,
            root,
            context_len,
            destroyed: AtomicBool::new(false),
            scroll_target: Mutex::new(None),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Range most recently passed to `scroll_to_anchor`.
    pub fn scroll_target(&self) -> Option<TextRange> {
        *self.scroll_target_slot()
    }

    fn scroll_target_slot(&self) -> MutexGuard<'_, Option<TextRange>> {
        self.scroll_target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_live(&self) -> Result<(), IntegrationError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(IntegrationError::Destroyed);
        }
        Ok(())
    }

    fn anchor_range(&self, range: TextRange, score: f64) -> Result<Anchor, IntegrationError> {
        let exact = range_text(&self.document, self.root, &range)?;
        Ok(Anchor { region: Region::Range(range), exact, score })
    }
}

impl Integration for HtmlIntegration {
    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Html
    }

    fn anchor(&self, selectors: &[Selector]) -> Result<Anchor, IntegrationError> {
        self.ensure_live()?;
        let quote = quote_selector(selectors);

        for selector in selectors {
            let Selector::Range(range_selector) = selector else { continue };
            match from_selector(&self.document, self.root, range_selector) {
                Ok(range) => {
                    let exact = range_text(&self.document, self.root, &range)?;
                    if quote.map_or(true, |quote| quote.exact == exact) {
                        return Ok(Anchor { region: Region::Range(range), exact, score: 1.0 });
                    }
                    debug!("range selector text no longer matches quote");
                }
                Err(error) => debug!(%error, "range selector did not resolve"),
            }
        }

        let text = self.document.text_content(self.root);
        let (position, score) =
            anchor_text_selectors(&text, selectors).ok_or(IntegrationError::NotFound)?;
        let range = text_position_to_range(&self.document, self.root, &position)?;
        self.anchor_range(range, score)
    }

    fn describe(&self, region: &Region) -> Result<Vec<Selector>, IntegrationError> {
        self.ensure_live()?;
        let Region::Range(range) = region else {
            return Err(IntegrationError::ForeignRegion);
        };

        let range_selector = to_selector(&self.document, self.root, range)?;
        let TextPositionSelector { start, end } =
            range_to_text_position(&self.document, self.root, range)?;
        let text = self.document.text_content(self.root);
        let quote =
            describe_quote(&text, start, end, self.context_len).ok_or(IntegrationError::EmptyRegion)?;

        Ok(vec![
            Selector::Range(range_selector),
            Selector::TextPosition(TextPositionSelector { start, end }),
            Selector::TextQuote(quote),
        ])
    }

    fn scroll_to_anchor(&self, anchor: &Anchor) -> Result<(), IntegrationError> {
        self.ensure_live()?;
        let Region::Range(range) = &anchor.region else {
            return Err(IntegrationError::ForeignRegion);
        };
        range_text(&self.document, self.root, range)?;
        *self.scroll_target_slot() = Some(*range);
        debug!(exact = %anchor.exact, "scrolled to anchor");
        Ok(())
    }

    fn get_metadata(&self) -> DocumentMetadata {
        let root = self.document.root();
        let title = self
            .document
            .elements_by_tag_name(root, "title")
            .first()
            .map(|&title| self.document.text_content(title).trim().to_string())
            .filter(|title| !title.is_empty());
        let canonical = self
            .document
            .elements_by_tag_name(root, "link")
            .into_iter()
            .filter(|&link| {
                self.document
                    .attribute(link, "rel")
                    .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
            })
            .find_map(|link| self.document.attribute(link, "href"));

        DocumentMetadata { title, uri: canonical.unwrap_or_else(|| self.window.url()), page_count: None }
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        *self.scroll_target_slot() = None;
    }
}
