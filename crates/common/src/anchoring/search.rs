// Error-tolerant substring search.
//
// Sellers-style dynamic programming over the text: column `j` holds, for
// every pattern prefix, the fewest edits needed to turn it into some
// substring of the text ending at `j`. Edits are insertions, deletions,
// substitutions and transpositions of adjacent characters. Only the ends
// tied for the lowest error count are kept; the start of each match is then
// recovered with an anchored pass of the reversed pattern over the reversed
// text leading up to the end, preferring the longest span.

/// A located substring match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Start offset (inclusive), in characters.
    pub start: usize,
    /// End offset (exclusive), in characters.
    pub end: usize,
    /// Edit count between the pattern and `text[start..end]`.
    pub errors: usize,
}

/// Every exact occurrence of `pattern`, overlapping ones included.
pub fn exact_search(text: &[char], pattern: &[char]) -> Vec<SearchMatch> {
    if pattern.is_empty() || pattern.len() > text.len() {
        return Vec::new();
    }

    text.windows(pattern.len())
        .enumerate()
        .filter(|(_, window)| *window == pattern)
        .map(|(start, _)| SearchMatch { start, end: start + pattern.len(), errors: 0 })
        .collect()
}

/// Search exactly first and fall back to the approximate search when the
/// pattern does not occur verbatim.
pub fn search(text: &[char], pattern: &[char], max_errors: usize) -> Vec<SearchMatch> {
    let exact = exact_search(text, pattern);
    if !exact.is_empty() {
        return exact;
    }
    approx_search(text, pattern, max_errors)
}

/// All matches with the lowest error count not exceeding `max_errors`,
/// ordered by end offset.
pub fn approx_search(text: &[char], pattern: &[char], max_errors: usize) -> Vec<SearchMatch> {
    let ends = find_match_ends(text, pattern, max_errors);
    find_match_starts(text, pattern, ends)
}

/// `(end, errors)` pairs for every text position where the pattern ends with
/// the minimum error count. The threshold ratchets down as better ends are
/// found, so earlier, worse ends are discarded.
fn find_match_ends(text: &[char], pattern: &[char], max_errors: usize) -> Vec<(usize, usize)> {
    let m = pattern.len();
    if m == 0 || text.is_empty() {
        return Vec::new();
    }

    let mut threshold = max_errors;
    let mut ends: Vec<(usize, usize)> = Vec::new();

    // Columns j-2, j-1 and j of the DP table; row i is the pattern prefix
    // of length i. Column 0 is the empty text prefix.
    let mut before_prev: Vec<usize> = (0..=m).collect();
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut current: Vec<usize> = vec![0; m + 1];

    for (j, &text_char) in text.iter().enumerate() {
        current[0] = 0;
        for i in 1..=m {
            let substitution = prev[i - 1] + usize::from(pattern[i - 1] != text_char);
            let deletion = current[i - 1] + 1;
            let insertion = prev[i] + 1;
            let mut best = substitution.min(deletion).min(insertion);

            if i >= 2 && j >= 1 && pattern[i - 1] == text[j - 1] && pattern[i - 2] == text_char {
                best = best.min(before_prev[i - 2] + 1);
            }
            current[i] = best;
        }

        let score = current[m];
        if score <= threshold {
            if score < threshold {
                ends.clear();
            }
            ends.push((j + 1, score));
            threshold = score;
        }

        std::mem::swap(&mut before_prev, &mut prev);
        std::mem::swap(&mut prev, &mut current);
    }

    ends
}

/// Pair each end with the longest span ending there whose edit distance
/// stays within its error count.
fn find_match_starts(
    text: &[char],
    pattern: &[char],
    ends: Vec<(usize, usize)>,
) -> Vec<SearchMatch> {
    let reversed_pattern: Vec<char> = pattern.iter().rev().copied().collect();

    ends.into_iter()
        .filter_map(|(end, errors)| {
            let min_start = end.saturating_sub(pattern.len() + errors);
            let reversed_text: Vec<char> = text[min_start..end].iter().rev().copied().collect();
            let distances = anchored_distances(&reversed_text, &reversed_pattern);
            let (length, distance) = distances
                .into_iter()
                .enumerate()
                .filter(|&(_, distance)| distance <= errors)
                .last()?;
            Some(SearchMatch { start: end - length, end, errors: distance })
        })
        .collect()
}

/// Edit distance between `pattern` and every prefix of `text`, indexed by
/// prefix length. Same edit model as [`find_match_ends`], but the match must
/// begin at the first character of `text`.
fn anchored_distances(text: &[char], pattern: &[char]) -> Vec<usize> {
    let m = pattern.len();
    let mut distances = Vec::with_capacity(text.len() + 1);
    distances.push(m);

    let mut before_prev: Vec<usize> = (0..=m).collect();
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut current: Vec<usize> = vec![0; m + 1];

    for (j, &text_char) in text.iter().enumerate() {
        current[0] = j + 1;
        for i in 1..=m {
            let substitution = prev[i - 1] + usize::from(pattern[i - 1] != text_char);
            let deletion = current[i - 1] + 1;
            let insertion = prev[i] + 1;
            let mut best = substitution.min(deletion).min(insertion);

            if i >= 2 && j >= 1 && pattern[i - 1] == text[j - 1] && pattern[i - 2] == text_char {
                best = best.min(before_prev[i - 2] + 1);
            }
            current[i] = best;
        }
        distances.push(current[m]);

        std::mem::swap(&mut before_prev, &mut prev);
        std::mem::swap(&mut prev, &mut current);
    }

    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(value: &str) -> Vec<char> {
        value.chars().collect()
    }

    fn slice(text: &str, found: &SearchMatch) -> String {
        text.chars().skip(found.start).take(found.end - found.start).collect()
    }

    #[test]
    fn exact_search_finds_overlapping_occurrences() {
        let found = exact_search(&chars("aaaa"), &chars("aa"));
        let starts: Vec<usize> = found.iter().map(|m| m.start).collect();
        assert_eq!(starts, vec![0, 1, 2]);
        assert!(found.iter().all(|m| m.errors == 0 && m.end == m.start + 2));
    }

    #[test]
    fn exact_search_empty_pattern_finds_nothing() {
        assert!(exact_search(&chars("abc"), &[]).is_empty());
    }

    #[test]
    fn exact_search_longer_pattern_finds_nothing() {
        assert!(exact_search(&chars("ab"), &chars("abc")).is_empty());
    }

    #[test]
    fn approx_search_counts_substitution() {
        let text = "hello wurld";
        let found = approx_search(&chars(text), &chars("world"), 2);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].errors, 1);
        assert_eq!(slice(text, &found[0]), "wurld");
    }

    #[test]
    fn approx_search_counts_transposition_as_one_edit() {
        let text = "ab cd ef";
        let found = approx_search(&chars(text), &chars("dc"), 1);
        assert_eq!(
            found,
            vec![
                SearchMatch { start: 3, end: 4, errors: 1 },
                SearchMatch { start: 3, end: 5, errors: 1 },
                SearchMatch { start: 4, end: 6, errors: 1 },
            ]
        );
        assert!(found.iter().any(|m| slice(text, m) == "cd"));
    }

    #[test]
    fn approx_search_starts_never_widen_past_the_error_count() {
        let found = approx_search(&chars("bab"), &chars("cb"), 1);
        assert_eq!(
            found,
            vec![SearchMatch { start: 0, end: 1, errors: 1 }, SearchMatch { start: 1, end: 3, errors: 1 }]
        );
    }

    #[test]
    fn anchored_distances_cover_every_prefix() {
        assert_eq!(anchored_distances(&chars("abx"), &chars("ab")), vec![2, 1, 0, 1]);
        assert_eq!(anchored_distances(&chars("ba"), &chars("ab")), vec![2, 1, 1]);
        assert_eq!(anchored_distances(&[], &chars("ab")), vec![2]);
    }

    #[test]
    fn approx_search_counts_insertion_and_deletion() {
        let text = "the colour red";
        let found = approx_search(&chars(text), &chars("color"), 2);
        assert!(found.iter().all(|m| m.errors == 1));
        assert!(found.iter().any(|m| slice(text, m) == "colour"));

        let text = "the colr red";
        let found = approx_search(&chars(text), &chars("color"), 2);
        assert_eq!(found[0].errors, 1);
        assert_eq!(slice(text, &found[0]), "colr");
    }

    #[test]
    fn approx_search_respects_error_budget() {
        assert!(approx_search(&chars("abcdef"), &chars("xyz"), 2).is_empty());
    }

    #[test]
    fn approx_search_keeps_only_minimum_error_ties() {
        let text = "cat bat cot";
        let found = approx_search(&chars(text), &chars("cut"), 2);
        assert!(!found.is_empty());
        assert!(found.iter().all(|m| m.errors == 1));
        let slices: Vec<String> = found.iter().map(|m| slice(text, m)).collect();
        assert!(slices.contains(&"cat".to_string()));
        assert!(slices.contains(&"cot".to_string()));
    }

    #[test]
    fn approx_search_results_are_ordered_by_end() {
        let found = approx_search(&chars("xbc abx"), &chars("abc"), 1);
        let ends: Vec<usize> = found.iter().map(|m| m.end).collect();
        let mut sorted = ends.clone();
        sorted.sort_unstable();
        assert_eq!(ends, sorted);
    }

    #[test]
    fn search_prefers_exact_hits() {
        let text = "abd abc";
        let found = search(&chars(text), &chars("abc"), 1);
        assert_eq!(found, vec![SearchMatch { start: 4, end: 7, errors: 0 }]);
    }

    #[test]
    fn approx_search_on_empty_text_finds_nothing() {
        assert!(approx_search(&[], &chars("abc"), 3).is_empty());
    }
}
