// `annotator match`: locate a quote in a text file, tolerating edits.

use std::path::PathBuf;

use annotator_common::anchoring::{match_quote, MatchContext};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exit_code::NoMatch;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// File holding the text to search.
    #[arg(long)]
    text: PathBuf,

    /// Quote to locate.
    #[arg(long)]
    quote: String,

    /// Text expected right before the quote.
    #[arg(long)]
    prefix: Option<String>,

    /// Text expected right after the quote.
    #[arg(long)]
    suffix: Option<String>,

    /// Expected start offset of the quote, in characters.
    #[arg(long)]
    hint: Option<usize>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub quote: String,
    pub start: usize,
    pub end: usize,
    pub score: f64,
    /// Text at the matched span, which may differ from the quote.
    pub matched: String,
}

impl MatchResult {
    pub fn is_exact(&self) -> bool {
        self.matched == self.quote
    }
}

pub fn run(args: MatchArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let context = MatchContext { prefix: args.prefix.clone(), suffix: args.suffix.clone(), hint: args.hint };

    let result = super::read_text(&args.text).and_then(|text| find_quote(&text, &args.quote, &context));
    match result {
        Ok(result) => {
            if !result.is_exact() {
                output::print_warning(
                    format,
                    "APPROXIMATE_MATCH",
                    &format!("matched text differs from the quote: `{}`", result.matched),
                );
            }
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

/// Locate `quote` in `text`.
pub fn find_quote(text: &str, quote: &str, context: &MatchContext) -> anyhow::Result<MatchResult> {
    let found = match_quote(text, quote, context).ok_or_else(|| NoMatch { quote: quote.to_string() })?;
    let matched: String = text.chars().skip(found.start).take(found.end - found.start).collect();
    debug!(start = found.start, end = found.end, score = found.score, "quote located");
    Ok(MatchResult { quote: quote.to_string(), start: found.start, end: found.end, score: found.score, matched })
}

fn format_human(result: &MatchResult) -> String {
    format!(
        "{}..{} (score {:.3})\n  {}",
        result.start, result.end, result.score, result.matched
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_code::ExitCode;
    use std::io::Write;

    const TEXT: &str = "The quick brown fox jumps over the lazy dog. The quick red fox naps.";

    #[test]
    fn exact_quote_is_found() {
        let result = find_quote(TEXT, "brown fox", &MatchContext::default()).unwrap();
        assert_eq!((result.start, result.end), (10, 19));
        assert!(result.is_exact());
    }

    #[test]
    fn context_picks_between_repeats() {
        let context = MatchContext::default().with_prefix("The quick ").with_suffix(" naps");
        let result = find_quote(TEXT, "red fox", &context).unwrap();
        assert_eq!(result.matched, "red fox");

        let hinted = find_quote(TEXT, "The quick", &MatchContext::default().with_hint(45)).unwrap();
        assert_eq!(hinted.start, 45);
    }

    #[test]
    fn edited_quote_is_approximate() {
        let result = find_quote(TEXT, "lazy dgo", &MatchContext::default()).unwrap();
        assert!(!result.is_exact());
        assert!(result.matched.starts_with("lazy d"));
    }

    #[test]
    fn missing_quote_maps_to_no_match_exit() {
        let err = find_quote(TEXT, "zebra crossing", &MatchContext::default()).unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::NoMatch);
    }

    #[test]
    fn reads_text_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{TEXT}").unwrap();
        let text = super::super::read_text(file.path()).unwrap();
        let result = find_quote(&text, "jumps", &MatchContext::default()).unwrap();
        assert_eq!((result.start, result.end), (20, 25));
    }

    #[test]
    fn human_format_shows_span_and_text() {
        let result = MatchResult {
            quote: "fox".into(),
            start: 16,
            end: 19,
            score: 1.0,
            matched: "fox".into(),
        };
        let output = format_human(&result);
        assert!(output.starts_with("16..19 (score 1.000)"));
        assert!(output.ends_with("fox"));
    }

    #[test]
    fn json_format_roundtrips() {
        let result = find_quote(TEXT, "lazy dog", &MatchContext::default()).unwrap();
        let mut buf = Vec::new();
        output::write_output(&mut buf, OutputFormat::Json, &result, format_human).unwrap();
        let parsed: MatchResult = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, result);
    }
}
