// Structural path parsing and formatting.
//
// A path is a sequence of `tag[index]` segments joined with `/`, each naming
// the `index`-th (1-based) child element with that tag name under the
// previous element. Tag names are lowercase on output and compared
// case-insensitively on input. The empty path designates the root itself.

use std::fmt;

use thiserror::Error;

/// Longest path accepted by [`parse_path`], in segments.
const MAX_PATH_SEGMENTS: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path segment `{0}` does not match `tag[index]`")]
    InvalidSegment(String),

    #[error("path segment `{0}` uses index 0, indexes start at 1")]
    ZeroIndex(String),

    #[error("path exceeds maximum depth of {MAX_PATH_SEGMENTS} segments")]
    TooDeep,
}

/// One `tag[index]` step of a structural path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Lowercase tag name.
    pub tag: String,
    /// 1-based position among siblings with the same tag name.
    pub index: usize,
}

impl PathSegment {
    pub fn new(tag: &str, index: usize) -> Self {
        Self { tag: tag.to_ascii_lowercase(), index }
    }

    /// Parse a single `tag[index]` segment.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let invalid = || PathError::InvalidSegment(raw.to_string());

        let open = raw.find('[').ok_or_else(invalid)?;
        let tag = &raw[..open];
        let rest = raw[open + 1..].strip_suffix(']').ok_or_else(invalid)?;

        if tag.is_empty() || !tag.chars().all(is_tag_char) {
            return Err(invalid());
        }
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let index: usize = rest.parse().map_err(|_| invalid())?;
        if index == 0 {
            return Err(PathError::ZeroIndex(raw.to_string()));
        }

        Ok(Self::new(tag, index))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.tag, self.index)
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Parse a full path. A leading `/` is optional; empty segments are rejected
/// except for the empty path itself, which yields no segments.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, PathError> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut raw_segments = trimmed.split('/');
    let segments = raw_segments
        .by_ref()
        .take(MAX_PATH_SEGMENTS)
        .map(PathSegment::parse)
        .collect::<Result<Vec<_>, _>>()?;
    if raw_segments.next().is_some() {
        return Err(PathError::TooDeep);
    }
    Ok(segments)
}

/// Format segments in root-to-node order as `/a[1]/b[2]`.
pub fn format_path(segments: &[PathSegment]) -> String {
    segments.iter().map(|segment| format!("/{segment}")).collect()
}
