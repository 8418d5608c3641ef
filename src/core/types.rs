//! core::types
//!
//! Strong types for field paths.
//!
//! # Types
//!
//! - [`Segment`] - One step of a path: a field name or an array index
//! - [`PathForm`] - Whether a path is rooted at the document or relative
//! - [`FieldPath`] - A parsed dotted path such as `sections.2.items.0.name`
//!
//! # Validation
//!
//! A `FieldPath` only exists once its text has been tokenized. Field-name
//! tokens are accepted whether or not they follow the naming convention; the
//! convention itself lives in [`crate::core::naming`] so that badly named
//! markers are reported instead of rejected.
//!
//! # Examples
//!
//! ```
//! use annotrace::core::types::{FieldPath, Segment};
//!
//! let abs = FieldPath::parse("sections.2.items.0.name").unwrap();
//! assert!(abs.is_absolute());
//! assert_eq!(abs.segments()[1], Segment::Index(2));
//!
//! let rel = FieldPath::parse(".items.0").unwrap();
//! assert!(rel.is_relative());
//! assert_eq!(rel.to_string(), ".items.0");
//!
//! assert!(FieldPath::parse("sections..0").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from path tokenization and combination.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("empty segment at position {position} in '{path}'")]
    EmptySegment { path: String, position: usize },

    #[error("invalid segment '{segment}' at position {position} in '{path}'")]
    InvalidSegment {
        path: String,
        segment: String,
        position: usize,
    },

    #[error("cannot join '{0}': right-hand path must be relative")]
    NotRelative(String),
}

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Record member access.
    Field(String),
    /// Ordered-list element access.
    Index(usize),
}

impl Segment {
    /// Classify a single token.
    ///
    /// Returns `None` when the token is neither an index (`^[0-9]+$`) nor a
    /// field-name token (`[A-Za-z_$][A-Za-z0-9_$-]*`).
    pub fn classify(token: &str) -> Option<Self> {
        let first = token.chars().next()?;

        if token.chars().all(|c| c.is_ascii_digit()) {
            return token.parse().ok().map(Segment::Index);
        }

        let starts_ok = first.is_ascii_alphabetic() || first == '_' || first == '$';
        let rest_ok = token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'));

        if starts_ok && rest_ok {
            Some(Segment::Field(token.to_string()))
        } else {
            None
        }
    }

    /// The field name, if this is a field segment.
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Segment::Field(name) => Some(name),
            Segment::Index(_) => None,
        }
    }

    /// The index, if this is an index segment.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Field(_) => None,
        }
    }

    /// Check if this is an index segment.
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Field(name) => write!(f, "{}", name),
            Segment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Whether a path is rooted at the document or at an ancestor context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathForm {
    /// Rooted at the document (`sections.0.heading`).
    Absolute,
    /// Leading `.`, meaningful only against an ancestor (`.heading`).
    Relative,
}

/// A tokenized field path.
///
/// Serializes as its dotted text form.
///
/// # Example
///
/// ```
/// use annotrace::core::types::FieldPath;
///
/// let root = FieldPath::parse("sections.0").unwrap();
/// assert_eq!(root.section_index(), Some(0));
///
/// let deeper = FieldPath::parse("sections.0.items").unwrap();
/// assert_eq!(deeper.section_index(), None);
/// assert_eq!(deeper.parent().unwrap(), root);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    form: PathForm,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Tokenize a dotted path.
    ///
    /// A leading `.` marks the path relative. Every remaining segment must
    /// classify as a field name or an index.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] describing the first segment that cannot be
    /// tokenized.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Err(PathError::Empty);
        }

        let (form, body) = match text.strip_prefix('.') {
            Some(rest) => (PathForm::Relative, rest),
            None => (PathForm::Absolute, text),
        };

        let mut segments = Vec::new();
        for (position, token) in body.split('.').enumerate() {
            if token.is_empty() {
                return Err(PathError::EmptySegment {
                    path: text.to_string(),
                    position,
                });
            }
            let segment = Segment::classify(token).ok_or_else(|| PathError::InvalidSegment {
                path: text.to_string(),
                segment: token.to_string(),
                position,
            })?;
            segments.push(segment);
        }

        Ok(Self { form, segments })
    }

    /// Build an absolute path from segments.
    pub fn absolute(segments: Vec<Segment>) -> Self {
        Self {
            form: PathForm::Absolute,
            segments,
        }
    }

    /// Build a relative path from segments.
    pub fn relative(segments: Vec<Segment>) -> Self {
        Self {
            form: PathForm::Relative,
            segments,
        }
    }

    /// The absolute path of a section root, `sections.<index>`.
    pub fn section(index: usize) -> Self {
        Self::absolute(vec![
            Segment::Field("sections".to_string()),
            Segment::Index(index),
        ])
    }

    pub fn form(&self) -> PathForm {
        self.form
    }

    pub fn is_absolute(&self) -> bool {
        self.form == PathForm::Absolute
    }

    pub fn is_relative(&self) -> bool {
        self.form == PathForm::Relative
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The path without its last segment, keeping the form.
    ///
    /// Returns `None` for a path with no segments.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            form: self.form,
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The first `len` segments, keeping the form.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            form: self.form,
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// Check whether `other`'s segments are a prefix of this path's segments.
    pub fn starts_with(&self, other: &FieldPath) -> bool {
        self.form == other.form && self.segments.starts_with(&other.segments)
    }

    /// If this path is exactly `sections.<i>`, return `i`.
    pub fn section_index(&self) -> Option<usize> {
        match (self.form, self.segments.as_slice()) {
            (PathForm::Absolute, [Segment::Field(name), Segment::Index(i)]) if name == "sections" => {
                Some(*i)
            }
            _ => None,
        }
    }

    /// Field-name segments, in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::as_field)
    }
}

impl std::str::FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.form == PathForm::Relative {
            write!(f, ".")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
