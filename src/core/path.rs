//! Property paths addressing values inside a validated object.
//!
//! Paths use dot notation for nested properties and bracket notation for
//! indexed or keyed collection members: `address.street`, `tags[0]`,
//! `meta[locale]`. The empty path addresses the object itself.
//!
//! A key that would otherwise read as an index (or is empty) is written
//! quoted: `meta["0"]`.

use crate::core::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Named property (`street` in `address.street`)
    Property(String),
    /// Position in a sequence (`0` in `tags[0]`)
    Index(usize),
    /// Key in a map (`locale` in `meta[locale]`)
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        PathSegment::Property(name.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(name: String) -> Self {
        PathSegment::Property(name)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Address of a value within an object graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// The empty path (the object as a whole).
    pub fn root() -> Self {
        Self::default()
    }

    /// Create a path from segments.
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Parse a path from its textual form.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        let mut pos = 0;

        while pos < input.len() {
            let rest = &input[pos..];

            if let Some(inner) = rest.strip_prefix('[') {
                if let Some(quoted) = inner.strip_prefix('"') {
                    let end = quoted
                        .find("\"]")
                        .ok_or(PathError::UnclosedBracket { position: pos })?;
                    segments.push(PathSegment::Key(quoted[..end].to_string()));
                    pos += end + 4;
                    continue;
                }
                let end = inner
                    .find(']')
                    .ok_or(PathError::UnclosedBracket { position: pos })?;
                let key = &inner[..end];
                if key.is_empty() {
                    return Err(PathError::EmptySegment { position: pos });
                }
                segments.push(match key.parse::<usize>() {
                    Ok(index) => PathSegment::Index(index),
                    Err(_) => PathSegment::Key(key.to_string()),
                });
                pos += end + 2;
                continue;
            }

            let name = if segments.is_empty() {
                rest
            } else {
                match rest.strip_prefix('.') {
                    Some(after_dot) => {
                        pos += 1;
                        after_dot
                    }
                    None => {
                        return Err(PathError::UnexpectedChar {
                            ch: rest.chars().next().unwrap_or_default(),
                            position: pos,
                        })
                    }
                }
            };

            let end = name.find(['.', '[', ']']).unwrap_or(name.len());
            if end == 0 {
                return match name.chars().next() {
                    Some(']') => Err(PathError::UnexpectedChar { ch: ']', position: pos }),
                    _ => Err(PathError::EmptySegment { position: pos }),
                };
            }
            segments.push(PathSegment::Property(name[..end].to_string()));
            pos += end;
        }

        Ok(Self { segments })
    }

    /// Append a property segment.
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Property(name.into()));
        self
    }

    /// Append an index segment.
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    /// Append a key segment.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// Concatenate another path onto this one.
    pub fn join(&self, other: &PropertyPath) -> PropertyPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.segments.truncate(len);
    }

    /// Check whether this path addresses the object itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Same as [`is_root`](Self::is_root).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Check whether `prefix` is a leading part of this path.
    pub fn starts_with(&self, prefix: &PropertyPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Property(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Property(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
                PathSegment::Key(key) if needs_quotes(key) => write!(f, "[\"{}\"]", key)?,
                PathSegment::Key(key) => write!(f, "[{}]", key)?,
            }
        }
        Ok(())
    }
}

fn needs_quotes(key: &str) -> bool {
    key.is_empty() || key.starts_with('"') || key.parse::<usize>().is_ok()
}

impl FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PropertyPath> for String {
    fn from(path: PropertyPath) -> Self {
        path.to_string()
    }
}
