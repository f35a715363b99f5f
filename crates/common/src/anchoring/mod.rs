// Text anchoring: approximate quote search, scoring and quote selectors.

pub mod match_quote;
pub mod quote;
pub mod search;

pub use match_quote::{match_quote, text_match_score, Match, MatchContext};
pub use quote::{anchor_quote, describe_quote, DEFAULT_CONTEXT_LEN};
