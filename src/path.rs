use std::borrow::Cow;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    Index(usize),
    Key(String),
}

impl Segment {
    /// Builds a field-name segment; ontology literals often carry stray padding.
    pub fn key(name: impl AsRef<str>) -> Self {
        Self::Key(name.as_ref().trim().to_string())
    }

    /// Numeric reading of the segment. All-digit field names count as indices.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(name) if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) => {
                name.parse::<usize>().ok()
            }
            Self::Key(_) => None,
        }
    }

    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Self::Index(index) => Cow::Owned(index.to_string()),
            Self::Key(name) => Cow::Borrowed(name.trim()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Key(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Self::key(name)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Ordered, non-empty list of segments addressing a value inside a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Segment>", into = "Vec<Segment>")]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn new(segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        let segments = segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Key(name) => Segment::key(name),
                index => index,
            })
            .collect();
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Splits into the intermediate segments and the final one.
    pub fn split_last(&self) -> (&Segment, &[Segment]) {
        match self.0.split_last() {
            Some(parts) => parts,
            None => unreachable!("paths are never empty"),
        }
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0
            .iter()
            .any(|segment| matches!(segment, Segment::Key(key) if key == name))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(name) if position == 0 => f.write_str(name)?,
                Segment::Key(name) => write!(f, ".{name}")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("path must contain at least one segment")]
pub struct EmptyPath;

impl TryFrom<Vec<Segment>> for Path {
    type Error = EmptyPath;

    fn try_from(segments: Vec<Segment>) -> Result<Self, Self::Error> {
        Self::new(segments).ok_or(EmptyPath)
    }
}

impl From<Path> for Vec<Segment> {
    fn from(path: Path) -> Self {
        path.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("literal is not a bracketed list or tuple")]
    NotAList,
    #[error("literal list is empty")]
    Empty,
    #[error("literal ends before the list is closed")]
    Unterminated,
    #[error("unexpected character {0:?} in literal")]
    UnexpectedChar(char),
    #[error("integer segment {0:?} is out of range")]
    InvalidInteger(String),
    #[error("unexpected input after closing bracket")]
    TrailingInput,
}

/// Parses an annotation literal such as `['Parameterisation', 'Cell', 0]` into a path.
pub fn parse_path_literal(text: &str) -> Result<Path, LiteralError> {
    let mut chars = text.trim().chars().peekable();
    let close = match chars.next() {
        Some('[') => ']',
        Some('(') => ')',
        _ => return Err(LiteralError::NotAList),
    };

    let mut segments = Vec::new();
    loop {
        skip_whitespace(&mut chars);
        match chars.peek().copied() {
            None => return Err(LiteralError::Unterminated),
            Some(c) if c == close => {
                chars.next();
                break;
            }
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                segments.push(Segment::key(read_quoted(&mut chars, quote)?));
            }
            Some(c) if c.is_ascii_digit() => segments.push(read_integer(&mut chars)?),
            Some(c) => return Err(LiteralError::UnexpectedChar(c)),
        }

        skip_whitespace(&mut chars);
        match chars.next() {
            Some(',') => {}
            Some(c) if c == close => break,
            Some(c) => return Err(LiteralError::UnexpectedChar(c)),
            None => return Err(LiteralError::Unterminated),
        }
    }

    skip_whitespace(&mut chars);
    if chars.next().is_some() {
        return Err(LiteralError::TrailingInput);
    }

    Path::new(segments).ok_or(LiteralError::Empty)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Result<String, LiteralError> {
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(LiteralError::Unterminated),
            Some(c) if c == quote => return Ok(out),
            Some('\\') => match chars.next() {
                None => return Err(LiteralError::Unterminated),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                Some(c) => {
                    out.push('\\');
                    out.push(c);
                }
            },
            Some(c) => out.push(c),
        }
    }
}

fn read_integer(chars: &mut Peekable<Chars<'_>>) -> Result<Segment, LiteralError> {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
        .parse::<usize>()
        .map(Segment::Index)
        .map_err(|_| LiteralError::InvalidInteger(digits))
}
