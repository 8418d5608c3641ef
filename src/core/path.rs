//! core::path
//!
//! Path algebra: parse, join, and look up field paths.
//!
//! None of these functions panic or return `Err` for lookup misses. A path
//! that cannot be tokenized comes back as a [`PathError`]; a path that does not
//! exist in the document comes back as [`Lookup::NotFound`] so callers can
//! report it and keep going.
//!
//! # Example
//!
//! ```
//! use annotrace::core::path::{get, join, parse, Lookup};
//! use serde_json::json;
//!
//! let doc = json!({ "sections": [{ "heading": "Shop" }] });
//! let base = parse("sections.0").unwrap();
//! let rel = parse(".heading").unwrap();
//! let abs = join(&base, &rel).unwrap();
//!
//! assert_eq!(abs.to_string(), "sections.0.heading");
//! assert_eq!(get(&doc, &abs), Lookup::Found(&json!("Shop")));
//! assert!(get(&doc, &parse("sections.1").unwrap()).is_not_found());
//! ```

use serde_json::Value;

use super::types::{FieldPath, PathError, Segment};

/// Tokenize a dotted path string.
pub fn parse(text: &str) -> Result<FieldPath, PathError> {
    FieldPath::parse(text)
}

/// Append a relative path to a base path.
///
/// The result is always absolute and carries
/// `base.segments ++ relative.segments`.
///
/// # Errors
///
/// Returns [`PathError::NotRelative`] when `relative` is not relative.
pub fn join(base: &FieldPath, relative: &FieldPath) -> Result<FieldPath, PathError> {
    if !relative.is_relative() {
        return Err(PathError::NotRelative(relative.to_string()));
    }
    let mut segments = base.segments().to_vec();
    segments.extend(relative.segments().iter().cloned());
    Ok(FieldPath::absolute(segments))
}

/// Why a lookup step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// A field step hit a record without that member.
    MissingField,
    /// An index step went past the end of a list.
    IndexOutOfRange,
    /// A field step hit a non-record, or an index step hit a non-list.
    TypeMismatch,
}

/// Result of walking a document along a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    /// The value at the path.
    Found(&'a Value),
    /// The walk stopped at segment `at_segment`.
    NotFound { at_segment: usize, miss: Miss },
}

impl<'a> Lookup<'a> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        !self.is_found()
    }

    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound { .. } => None,
        }
    }
}

/// Walk `document` along the segments of `path`.
///
/// The path's form is ignored; callers pass absolute paths.
pub fn get<'a>(document: &'a Value, path: &FieldPath) -> Lookup<'a> {
    let mut current = document;

    for (at_segment, segment) in path.segments().iter().enumerate() {
        let next = match segment {
            Segment::Field(name) => match current.as_object() {
                Some(record) => record.get(name).ok_or(Miss::MissingField),
                None => Err(Miss::TypeMismatch),
            },
            Segment::Index(index) => match current.as_array() {
                Some(list) => list.get(*index).ok_or(Miss::IndexOutOfRange),
                None => Err(Miss::TypeMismatch),
            },
        };

        match next {
            Ok(value) => current = value,
            Err(miss) => return Lookup::NotFound { at_segment, miss },
        }
    }

    Lookup::Found(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "sections": [
                {
                    "_type": "categoriesSection",
                    "heading": "Shop",
                    "items": [{ "name": "Electronics" }, { "name": "Fashion" }]
                }
            ]
        })
    }

    #[test]
    fn join_appends_segments() {
        let base = parse("sections.0").unwrap();
        let rel = parse(".items.1.name").unwrap();
        let joined = join(&base, &rel).unwrap();
        assert!(joined.is_absolute());
        assert_eq!(joined.to_string(), "sections.0.items.1.name");
    }

    #[test]
    fn join_relative_base_still_absolute() {
        let base = parse(".items").unwrap();
        let rel = parse(".0").unwrap();
        assert_eq!(join(&base, &rel).unwrap().to_string(), "items.0");
    }

    #[test]
    fn join_rejects_absolute_rhs() {
        let base = parse("sections.0").unwrap();
        let abs = parse("items").unwrap();
        assert_eq!(
            join(&base, &abs),
            Err(PathError::NotRelative("items".to_string()))
        );
    }

    #[test]
    fn get_walks_fields_and_indices() {
        let doc = doc();
        let path = parse("sections.0.items.1.name").unwrap();
        assert_eq!(get(&doc, &path).value(), Some(&json!("Fashion")));
    }

    #[test]
    fn get_empty_path_is_document() {
        let doc = doc();
        let empty = FieldPath::absolute(vec![]);
        assert_eq!(get(&doc, &empty).value(), Some(&doc));
    }

    #[test]
    fn get_missing_field() {
        let doc = doc();
        let path = parse("sections.0.subtitle").unwrap();
        assert_eq!(
            get(&doc, &path),
            Lookup::NotFound {
                at_segment: 2,
                miss: Miss::MissingField
            }
        );
    }

    #[test]
    fn get_index_out_of_range() {
        let doc = doc();
        let path = parse("sections.0.items.2.name").unwrap();
        assert_eq!(
            get(&doc, &path),
            Lookup::NotFound {
                at_segment: 3,
                miss: Miss::IndexOutOfRange
            }
        );
    }

    #[test]
    fn get_type_mismatch() {
        let doc = doc();
        // index into a record
        let path = parse("sections.0.0").unwrap();
        assert_eq!(
            get(&doc, &path),
            Lookup::NotFound {
                at_segment: 2,
                miss: Miss::TypeMismatch
            }
        );
        // field on a string
        let path = parse("sections.0.heading.text").unwrap();
        assert!(get(&doc, &path).is_not_found());
    }

    #[test]
    fn get_null_value_is_found() {
        let doc = json!({ "a": null });
        assert!(get(&doc, &parse("a").unwrap()).is_found());
    }
}
