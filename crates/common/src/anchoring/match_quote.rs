// Quote relocation: find the best match for a recorded quote in text that may
// have changed since the quote was captured.
//
// Candidates come from `search::search` (exact hits first, approximate
// otherwise) and are ranked by a weighted blend of quote similarity, prefix
// and suffix similarity, and proximity to a position hint.

use serde::{Deserialize, Serialize};

use super::search::{search, SearchMatch};

/// Hard cap on the edit budget for a quote, whatever its length.
const MAX_QUOTE_ERRORS: usize = 256;

const QUOTE_WEIGHT: f64 = 50.0;
const PREFIX_WEIGHT: f64 = 20.0;
const SUFFIX_WEIGHT: f64 = 20.0;
const POSITION_WEIGHT: f64 = 2.0;
const MAX_SCORE: f64 = QUOTE_WEIGHT + PREFIX_WEIGHT + SUFFIX_WEIGHT + POSITION_WEIGHT;

/// Best relocation of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Start offset (inclusive), in characters.
    pub start: usize,
    /// End offset (exclusive), in characters.
    pub end: usize,
    /// Normalized score in `[0, 1]`.
    pub score: f64,
}

/// Optional hints that disambiguate between equally good textual matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchContext {
    /// Text expected immediately before the quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Text expected immediately after the quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Expected start offset of the quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<usize>,
}

impl MatchContext {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_hint(mut self, hint: usize) -> Self {
        self.hint = Some(hint);
        self
    }
}

/// Edit budget for a quote of `quote_len` characters.
pub fn max_errors_for(quote_len: usize) -> usize {
    MAX_QUOTE_ERRORS.min(quote_len / 2)
}

/// Find the best-scoring occurrence of `quote` in `text`.
///
/// Returns `None` for an empty quote or when nothing is within the edit
/// budget. Ties on score go to the longer candidate, then to the candidate
/// with the lower end offset.
pub fn match_quote(text: &str, quote: &str, context: &MatchContext) -> Option<Match> {
    let quote: Vec<char> = quote.chars().collect();
    if quote.is_empty() {
        return None;
    }

    let text: Vec<char> = text.chars().collect();
    let prefix: Option<Vec<char>> = non_empty_chars(context.prefix.as_deref());
    let suffix: Option<Vec<char>> = non_empty_chars(context.suffix.as_deref());

    let candidates = search(&text, &quote, max_errors_for(quote.len()));

    let mut best: Option<Match> = None;
    for candidate in candidates {
        let score = score_candidate(&text, quote.len(), &candidate, prefix.as_deref(), suffix.as_deref(), context.hint);
        let scored = Match { start: candidate.start, end: candidate.end, score };

        best = match best {
            None => Some(scored),
            Some(current) if is_better(&scored, &current) => Some(scored),
            keep => keep,
        };
    }

    best
}

fn is_better(candidate: &Match, current: &Match) -> bool {
    if candidate.score != current.score {
        return candidate.score > current.score;
    }
    candidate.end - candidate.start > current.end - current.start
}

fn non_empty_chars(value: Option<&str>) -> Option<Vec<char>> {
    value.filter(|v| !v.is_empty()).map(|v| v.chars().collect())
}

fn score_candidate(
    text: &[char],
    quote_len: usize,
    candidate: &SearchMatch,
    prefix: Option<&[char]>,
    suffix: Option<&[char]>,
    hint: Option<usize>,
) -> f64 {
    let quote_score = 1.0 - candidate.errors as f64 / quote_len as f64;

    let prefix_score = prefix.map_or(1.0, |prefix| {
        let from = candidate.start.saturating_sub(prefix.len());
        text_match_score_chars(&text[from..candidate.start], prefix)
    });

    let suffix_score = suffix.map_or(1.0, |suffix| {
        let to = (candidate.end + suffix.len()).min(text.len());
        text_match_score_chars(&text[candidate.end..to], suffix)
    });

    let position_score = hint.map_or(1.0, |hint| {
        let offset = candidate.start.abs_diff(hint) as f64;
        (1.0 - offset / text.len() as f64).max(0.0)
    });

    let raw = QUOTE_WEIGHT * quote_score
        + PREFIX_WEIGHT * prefix_score
        + SUFFIX_WEIGHT * suffix_score
        + POSITION_WEIGHT * position_score;

    raw / MAX_SCORE
}

/// Similarity in `[0, 1]` between `needle` and its best match in `text`.
///
/// Zero when either side is empty.
pub fn text_match_score(text: &str, needle: &str) -> f64 {
    let text: Vec<char> = text.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    text_match_score_chars(&text, &needle)
}

fn text_match_score_chars(text: &[char], needle: &[char]) -> f64 {
    if needle.is_empty() || text.is_empty() {
        return 0.0;
    }

    // With a budget of the whole needle there is always at least one match.
    search(text, needle, needle.len())
        .first()
        .map_or(0.0, |best| 1.0 - best.errors as f64 / needle.len() as f64)
}
