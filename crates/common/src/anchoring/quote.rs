// Quote selectors: describe a span of text by its content and context, and
// relocate such a description in a (possibly edited) text.

use crate::selector::{TextPositionSelector, TextQuoteSelector};

use super::match_quote::{match_quote, Match, MatchContext};

/// Characters of context captured on each side of a quote.
pub const DEFAULT_CONTEXT_LEN: usize = 32;

/// Describe `text[start..end]` (character offsets) as a quote selector with up
/// to `context_len` characters of prefix and suffix.
///
/// Returns `None` when the span is empty, inverted or out of bounds.
pub fn describe_quote(
    text: &str,
    start: usize,
    end: usize,
    context_len: usize,
) -> Option<TextQuoteSelector> {
    let chars: Vec<char> = text.chars().collect();
    if start >= end || end > chars.len() {
        return None;
    }

    let prefix_from = start.saturating_sub(context_len);
    let suffix_to = (end + context_len).min(chars.len());

    Some(TextQuoteSelector {
        exact: chars[start..end].iter().collect(),
        prefix: Some(chars[prefix_from..start].iter().collect()),
        suffix: Some(chars[end..suffix_to].iter().collect()),
    })
}

/// Relocate a quote selector in `text`, optionally biased towards `hint`.
pub fn anchor_quote(
    text: &str,
    selector: &TextQuoteSelector,
    hint: Option<usize>,
) -> Option<(TextPositionSelector, Match)> {
    let context = MatchContext {
        prefix: selector.prefix.clone(),
        suffix: selector.suffix.clone(),
        hint,
    };

    match_quote(text, &selector.exact, &context)
        .map(|found| (TextPositionSelector { start: found.start, end: found.end }, found))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_captures_bounded_context() {
        let text = "0123456789abcdef";
        let quote = describe_quote(text, 6, 9, 4).unwrap();
        assert_eq!(quote.exact, "678");
        assert_eq!(quote.prefix.as_deref(), Some("2345"));
        assert_eq!(quote.suffix.as_deref(), Some("9abc"));
    }

    #[test]
    fn describe_clamps_context_at_text_edges() {
        let quote = describe_quote("abcdef", 0, 6, 32).unwrap();
        assert_eq!(quote.exact, "abcdef");
        assert_eq!(quote.prefix.as_deref(), Some(""));
        assert_eq!(quote.suffix.as_deref(), Some(""));
    }

    #[test]
    fn describe_rejects_bad_spans() {
        assert!(describe_quote("abc", 2, 2, 4).is_none());
        assert!(describe_quote("abc", 2, 1, 4).is_none());
        assert!(describe_quote("abc", 1, 9, 4).is_none());
    }

    #[test]
    fn anchor_after_edit_uses_context() {
        let original = "Alpha note. Beta note. Gamma note.";
        let quote = describe_quote(original, 17, 21, DEFAULT_CONTEXT_LEN).unwrap();
        assert_eq!(quote.exact, "note");

        let edited = "Intro! Alpha note. Beta note. Gamma note.";
        let (position, found) = anchor_quote(edited, &quote, None).unwrap();
        assert_eq!((position.start, position.end), (24, 28));
        assert!(found.score > 0.9);
    }

    #[test]
    fn anchor_missing_quote_is_none() {
        let quote = TextQuoteSelector { exact: "zebra".into(), prefix: None, suffix: None };
        assert!(anchor_quote("horses only", &quote, None).is_none());
    }
}
