//! Glob-style path patterns.
//!
//! # Syntax
//! - Patterns start with `/` and are split on `/` into segments
//! - `*` matches exactly one non-empty segment
//! - `**` matches zero or more segments
//! - A literal segment may embed `*` to glob within that segment (`*.json`)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Patterns are compiled once at load time; matching allocates nothing
//! - No regex

use std::fmt;
use std::str::FromStr;

/// Error returned for a malformed pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("'**' must occupy a whole segment: {0}")]
    MixedDoubleWildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Exact text.
    Literal(String),
    /// `*`: one non-empty segment.
    Any,
    /// `**`: zero or more segments.
    AnyDepth,
    /// Text with embedded `*`, matched within a single segment.
    Glob(String),
}

impl Segment {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            Segment::Literal(text) => text == candidate,
            Segment::Any => !candidate.is_empty(),
            Segment::Glob(glob) => glob_matches(glob.as_bytes(), candidate.as_bytes()),
            Segment::AnyDepth => true,
        }
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let rest = pattern
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(pattern.to_string()))?;

        let mut segments = Vec::new();
        for part in rest.split('/') {
            let segment = match part {
                "*" => Segment::Any,
                "**" => Segment::AnyDepth,
                p if p.contains("**") => {
                    return Err(PatternError::MixedDoubleWildcard(pattern.to_string()))
                }
                p if p.contains('*') => Segment::Glob(p.to_string()),
                p => Segment::Literal(p.to_string()),
            };
            // Consecutive `**` are equivalent to one.
            if segment == Segment::AnyDepth && segments.last() == Some(&Segment::AnyDepth) {
                continue;
            }
            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The pattern text as written in the route definition.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test whether `path` (undecoded URI path) matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };
        let parts: Vec<&str> = rest.split('/').collect();
        match_segments(&self.segments, &parts)
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            // Try every split point, shortest consumption first.
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((first, tail)) => segment.matches(first) && match_segments(rest, tail),
            None => false,
        },
    }
}

/// `*` inside a single segment matches any run of characters.
fn glob_matches(glob: &[u8], text: &[u8]) -> bool {
    let (mut g, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if g < glob.len() && glob[g] == b'*' {
            backtrack = Some((g, t));
            g += 1;
        } else if g < glob.len() && glob[g] == text[t] {
            g += 1;
            t += 1;
        } else if let Some((star, consumed)) = backtrack {
            g = star + 1;
            t = consumed + 1;
            backtrack = Some((star, consumed + 1));
        } else {
            return false;
        }
    }
    glob[g..].iter().all(|&c| c == b'*')
}
