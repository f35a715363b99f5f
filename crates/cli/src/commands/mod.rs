// CLI subcommand dispatch.

use std::path::{Path, PathBuf};

use annotator_bridge::config::BridgeConfig;
use anyhow::Context;
use clap::Subcommand;

pub mod describe;
pub mod locate;

#[derive(Subcommand)]
pub enum Command {
    /// Locate a quote in a text file, tolerating edits
    Match(locate::MatchArgs),
    /// Describe a character span as text selectors
    Describe(describe::DescribeArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Match(args) => locate::run(args),
        Command::Describe(args) => describe::run(args),
    }
}

pub(crate) fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))
}

/// Explicit config file, or the global one (defaults when absent).
pub(crate) fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::load_from(path)
            .with_context(|| format!("failed to load config `{}`", path.display())),
        None => Ok(BridgeConfig::load()),
    }
}
