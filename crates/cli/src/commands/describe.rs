// `annotator describe`: turn a character span into text selectors.

use std::path::PathBuf;

use annotator_common::anchoring::describe_quote;
use annotator_common::selector::{Selector, TextPositionSelector};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::exit_code::InvalidSpan;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// File holding the text.
    #[arg(long)]
    text: PathBuf,

    /// Start offset, in characters (inclusive).
    #[arg(long)]
    start: usize,

    /// End offset, in characters (exclusive).
    #[arg(long)]
    end: usize,

    /// Characters of prefix/suffix context (defaults to `[anchoring] context_len`).
    #[arg(long)]
    context: Option<usize>,

    /// Config file to read instead of `~/.annotator/config.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub selectors: Vec<Selector>,
}

pub fn run(args: DescribeArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = super::load_config(args.config.as_ref()).and_then(|config| {
        let context_len = args.context.unwrap_or(config.anchoring.context_len);
        let text = super::read_text(&args.text)?;
        Ok(describe_span(&text, args.start, args.end, context_len)?)
    });

    match result {
        Ok(description) => {
            output::print_output(format, &description, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

/// Position and quote selectors for `text[start..end]`.
pub fn describe_span(
    text: &str,
    start: usize,
    end: usize,
    context_len: usize,
) -> Result<Description, InvalidSpan> {
    let quote = describe_quote(text, start, end, context_len)
        .ok_or_else(|| InvalidSpan { start, end, length: text.chars().count() })?;
    Ok(Description {
        selectors: vec![
            Selector::TextPosition(TextPositionSelector { start, end }),
            Selector::TextQuote(quote),
        ],
    })
}

fn format_human(description: &Description) -> String {
    description
        .selectors
        .iter()
        .map(|selector| match selector {
            Selector::TextPosition(position) => {
                format!("position  {}..{}", position.start, position.end)
            }
            Selector::TextQuote(quote) => format!(
                "quote     {}[{}]{}",
                quote.prefix.as_deref().unwrap_or_default(),
                quote.exact,
                quote.suffix.as_deref().unwrap_or_default()
            ),
            Selector::Range(range) => format!(
                "range     {}:{} .. {}:{}",
                range.start_container, range.start_offset, range.end_container, range.end_offset
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::locate::find_quote;
    use crate::exit_code::ExitCode;
    use annotator_bridge::config::{AnchoringConfig, BridgeConfig};
    use annotator_common::anchoring::MatchContext;

    const TEXT: &str = "Anchors should survive small edits to the surrounding text.";

    #[test]
    fn describes_span_with_context() {
        let description = describe_span(TEXT, 15, 22, 6).unwrap();
        assert_eq!(description.selectors.len(), 2);
        let Selector::TextQuote(quote) = &description.selectors[1] else {
            panic!("expected a quote selector");
        };
        assert_eq!(quote.exact, "survive");
        assert_eq!(quote.prefix.as_deref(), Some("hould "));
        assert_eq!(quote.suffix.as_deref(), Some(" small"));
    }

    #[test]
    fn described_quote_relocates_after_edit() {
        let description = describe_span(TEXT, 15, 22, 8).unwrap();
        let Selector::TextQuote(quote) = &description.selectors[1] else {
            panic!("expected a quote selector");
        };
        let edited = TEXT.replace("Anchors", "Text anchors");
        let context = MatchContext {
            prefix: quote.prefix.clone(),
            suffix: quote.suffix.clone(),
            hint: Some(15),
        };
        let found = find_quote(&edited, &quote.exact, &context).unwrap();
        assert_eq!((found.start, found.end), (20, 27));
    }

    #[test]
    fn invalid_spans_are_usage_errors() {
        for (start, end) in [(5, 5), (9, 3), (0, 1000)] {
            let err = anyhow::Error::new(describe_span(TEXT, start, end, 4).unwrap_err());
            assert_eq!(ExitCode::from_error(&err), ExitCode::Usage);
        }
    }

    #[test]
    fn context_length_comes_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = BridgeConfig { anchoring: AnchoringConfig { context_len: 3 }, ..Default::default() };
        config.save_to(&path).unwrap();

        let loaded = super::super::load_config(Some(&path)).unwrap();
        let description = describe_span(TEXT, 15, 22, loaded.anchoring.context_len).unwrap();
        let Selector::TextQuote(quote) = &description.selectors[1] else {
            panic!("expected a quote selector");
        };
        assert_eq!(quote.prefix.as_deref(), Some("ld "));
    }

    #[test]
    fn broken_config_maps_to_config_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[anchoring]\ncontext_len = \"wide\"\n").unwrap();
        let err = super::super::load_config(Some(&path)).unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::Config);
    }

    #[test]
    fn human_format_lists_selectors() {
        let output = format_human(&describe_span(TEXT, 15, 22, 2).unwrap());
        assert_eq!(output, "position  15..22\nquote     d [survive] s");
    }
}
