//! Typed document paths and their textual grammar.
//!
//! Paths are parsed once at the protocol boundary into tagged segments so the
//! resolver never inspects raw text. The accepted grammar joins segments with
//! `.`; an index may be written either in bracket form (`data[0]`) or as a
//! bare numeric segment (`data.0`). Both normalise to [`Segment::Index`].

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// One step of navigation within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member access by field name.
    Field(String),
    /// Sequence element access by position.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => formatter.write_str(name),
            Self::Index(index) => write!(formatter, "[{index}]"),
        }
    }
}

/// Ordered sequence of segments addressing a subtree of a document.
///
/// The empty path addresses the whole root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The empty path.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses path text into typed segments.
    ///
    /// Empty input yields the root path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PathSyntax`] for empty segments, unterminated or
    /// non-numeric brackets, and trailing separators.
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        let mut segments = Vec::new();
        let mut rest = input;

        while !rest.is_empty() {
            rest = parse_segment(rest, input, &mut segments)?;
            rest = consume_separator(rest, input)?;
        }

        Ok(Self { segments })
    }

    /// The segments in navigation order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the path addresses the whole root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Splits off the final segment, leaving the parent path.
    ///
    /// Returns `None` for the root path.
    #[must_use]
    pub fn split_last(&self) -> Option<(&[Segment], &Segment)> {
        self.segments.split_last().map(|(last, parent)| (parent, last))
    }
}

impl FromStr for Path {
    type Err = StoreError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl fmt::Display for Path {
    /// Renders the normalised form: fields dotted, indices bracketed
    /// (`a.b[1].c`). The output round-trips through [`Path::parse`].
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 && matches!(segment, Segment::Field(_)) {
                formatter.write_str(".")?;
            }
            write!(formatter, "{segment}")?;
        }
        Ok(())
    }
}

/// Consumes one segment from `rest`, pushing it onto `segments`.
fn parse_segment<'a>(
    rest: &'a str,
    full: &str,
    segments: &mut Vec<Segment>,
) -> Result<&'a str, StoreError> {
    if let Some(after_open) = rest.strip_prefix('[') {
        let Some(close) = after_open.find(']') else {
            return Err(StoreError::syntax(full, "unterminated '['"));
        };
        let (digits, remainder) = after_open.split_at(close);
        let index = parse_index(digits, full)?;
        segments.push(Segment::Index(index));
        // Skip the closing bracket itself.
        return Ok(&remainder[1..]);
    }

    let end = rest
        .find(['.', '['])
        .unwrap_or(rest.len());
    let (token, remainder) = rest.split_at(end);
    if token.is_empty() {
        return Err(StoreError::syntax(full, "empty segment"));
    }
    if token.bytes().all(|byte| byte.is_ascii_digit()) {
        segments.push(Segment::Index(parse_index(token, full)?));
    } else {
        segments.push(Segment::Field(token.to_owned()));
    }
    Ok(remainder)
}

fn parse_index(digits: &str, full: &str) -> Result<usize, StoreError> {
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(StoreError::syntax(
            full,
            format!("'{digits}' is not a non-negative integer"),
        ));
    }
    digits
        .parse()
        .map_err(|_| StoreError::syntax(full, format!("index '{digits}' out of range")))
}

/// Consumes the separator after a segment: nothing before `[`, a single `.`
/// otherwise. A trailing `.` is a syntax error.
fn consume_separator<'a>(rest: &'a str, full: &str) -> Result<&'a str, StoreError> {
    if rest.is_empty() || rest.starts_with('[') {
        return Ok(rest);
    }
    let Some(after_dot) = rest.strip_prefix('.') else {
        return Err(StoreError::syntax(full, "expected '.' or '['"));
    };
    if after_dot.is_empty() {
        return Err(StoreError::syntax(full, "trailing '.'"));
    }
    Ok(after_dot)
}
