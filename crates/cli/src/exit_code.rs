// Consistent exit codes for the annotator CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   3  = quote not found
//   4  = input file unreadable
//   5  = invalid configuration

use std::process;

use annotator_bridge::config::ConfigError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NoMatch = 3,
    Input = 4,
    Config = 5,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<NoMatch>().is_some() {
                return Self::NoMatch;
            }
            if cause.downcast_ref::<InvalidSpan>().is_some() {
                return Self::Usage;
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::Config;
            }
            if cause.downcast_ref::<std::io::Error>().is_some() {
                return Self::Input;
            }
        }
        Self::Error
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// The quote could not be located within the edit budget.
#[derive(Debug)]
pub struct NoMatch {
    pub quote: String,
}

impl std::fmt::Display for NoMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no match for quote `{}`", self.quote)
    }
}

impl std::error::Error for NoMatch {}

/// A character span that is empty, inverted or past the end of the text.
#[derive(Debug)]
pub struct InvalidSpan {
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

impl std::fmt::Display for InvalidSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid span {}..{} for text of {} characters", self.start, self.end, self.length)
    }
}

impl std::error::Error for InvalidSpan {}
