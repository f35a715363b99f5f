// Structural node paths: `/tag[n]/tag[n]` locators relative to a root element.

pub mod structural;

pub use structural::{format_path, parse_path, PathError, PathSegment};
