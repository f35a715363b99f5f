// Serializable selectors describing where an annotation is anchored.
//
// These shapes are persisted by annotation storage and resolved much later,
// so field names and `type` tags must stay stable.

use serde::{Deserialize, Serialize};

/// Structural position of a text range below a root element.
///
/// Containers are structural paths (`/tag[n]/...`) from the root to the
/// element holding each boundary; offsets count characters of that element's
/// text content. Offsets are signed so that negative values coming off the
/// wire can be rejected explicitly at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "RangeSelector", rename_all = "camelCase")]
pub struct PositionSelector {
    pub start_container: String,
    pub start_offset: i64,
    pub end_container: String,
    pub end_offset: i64,
}

/// Quoted text plus surrounding context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "TextQuoteSelector")]
pub struct TextQuoteSelector {
    pub exact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// Character offsets into the text content of a document or root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "TextPositionSelector")]
pub struct TextPositionSelector {
    pub start: usize,
    pub end: usize,
}

/// Any selector an annotation target may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Range(PositionSelector),
    TextQuote(TextQuoteSelector),
    TextPosition(TextPositionSelector),
}

impl From<PositionSelector> for Selector {
    fn from(selector: PositionSelector) -> Self {
        Self::Range(selector)
    }
}

impl From<TextQuoteSelector> for Selector {
    fn from(selector: TextQuoteSelector) -> Self {
        Self::TextQuote(selector)
    }
}

impl From<TextPositionSelector> for Selector {
    fn from(selector: TextPositionSelector) -> Self {
        Self::TextPosition(selector)
    }
}
