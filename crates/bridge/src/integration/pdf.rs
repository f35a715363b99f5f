use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use annotator_common::anchoring::describe_quote;
use annotator_common::selector::{Selector, TextPositionSelector};
use tracing::debug;

use super::{
    anchor_text_selectors, Anchor, DocumentMetadata, Integration, IntegrationError,
    IntegrationKind, Region,
};

/// Anchoring in the extracted text of a PDF, page by page.
pub struct PdfIntegration {
    uri: String,
    title: Option<String>,
    pages: Vec<String>,
    context_len: usize,
    destroyed: AtomicBool,
    scroll_target: Mutex<Option<usize>>,
}

impl PdfIntegration {
    pub fn new(uri: impl Into<String>, title: Option<String>, pages: Vec<String>, context_len: usize) -> Self {
        Self {
            uri: uri.into(),
            title,
            pages,
            context_len,
            destroyed: AtomicBool::new(false),
            scroll_target: Mutex::new(None),
        }
    }

    fn text(&self) -> String {
        self.pages.concat()
    }

    /// Page containing document character offset `offset`.
    pub fn page_of(&self, offset: usize) -> usize {
        let mut seen = 0;
        for (index, page) in self.pages.iter().enumerate() {
            seen += page.chars().count();
            if offset < seen {
                return index;
            }
        }
        self.pages.len().saturating_sub(1)
    }

    /// Page most recently scrolled to.
    pub fn scroll_target(&self) -> Option<usize> {
        *self.scroll_target_slot()
    }

    fn scroll_target_slot(&self) -> MutexGuard<'_, Option<usize>> {
        self.scroll_target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_live(&self) -> Result<(), IntegrationError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(IntegrationError::Destroyed);
        }
        Ok(())
    }
}

impl Integration for PdfIntegration {
    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Pdf
    }

    fn anchor(&self, selectors: &[Selector]) -> Result<Anchor, IntegrationError> {
        self.ensure_live()?;
        let text = self.text();
        let (position, score) =
            anchor_text_selectors(&text, selectors).ok_or(IntegrationError::NotFound)?;
        let exact: String =
            text.chars().skip(position.start).take(position.end - position.start).collect();
        Ok(Anchor {
            region: Region::Pdf { page: self.page_of(position.start), start: position.start, end: position.end },
            exact,
            score,
        })
    }

    fn describe(&self, region: &Region) -> Result<Vec<Selector>, IntegrationError> {
        self.ensure_live()?;
        let Region::Pdf { start, end, .. } = *region else {
            return Err(IntegrationError::ForeignRegion);
        };
        let quote = describe_quote(&self.text(), start, end, self.context_len)
            .ok_or(IntegrationError::EmptyRegion)?;
        Ok(vec![Selector::TextPosition(TextPositionSelector { start, end }), Selector::TextQuote(quote)])
    }

    fn scroll_to_anchor(&self, anchor: &Anchor) -> Result<(), IntegrationError> {
        self.ensure_live()?;
        let Region::Pdf { page, .. } = anchor.region else {
            return Err(IntegrationError::ForeignRegion);
        };
        *self.scroll_target_slot() = Some(page);
        debug!(page, "scrolled to pdf page");
        Ok(())
    }

    fn get_metadata(&self) -> DocumentMetadata {
        DocumentMetadata { title: self.title.clone(), uri: self.uri.clone(), page_count: Some(self.pages.len()) }
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        *self.scroll_target_slot() = None;
    }
}
