//! core::naming
//!
//! Field naming rules for markers and declarations.
//!
//! Every field-name segment must be camelCase (`^[a-z][a-zA-Z0-9]*$`); index
//! segments must be plain digits. Snake case, kebab case, leading capitals and
//! leading underscores are all rejected.

use super::types::{FieldPath, Segment};

/// Check a field name against `^[a-z][a-zA-Z0-9]*$`.
///
/// # Example
///
/// ```
/// use annotrace::core::naming::is_camel_case;
///
/// assert!(is_camel_case("buttonText"));
/// assert!(is_camel_case("items"));
/// assert!(!is_camel_case("Item_Name"));
/// assert!(!is_camel_case("button-text"));
/// ```
pub fn is_camel_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// Check a token against `^[0-9]+$`.
pub fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Check one segment against the naming rule.
pub fn segment_conforms(segment: &Segment) -> bool {
    match segment {
        Segment::Field(name) => is_camel_case(name),
        Segment::Index(_) => true,
    }
}

/// Field-name segments of `path` that break the naming rule, in order.
///
/// # Example
///
/// ```
/// use annotrace::core::naming::nonconforming_segments;
/// use annotrace::core::types::FieldPath;
///
/// let path = FieldPath::parse(".items.0.Item_Name").unwrap();
/// assert_eq!(nonconforming_segments(&path), vec!["Item_Name"]);
/// ```
pub fn nonconforming_segments(path: &FieldPath) -> Vec<&str> {
    path.segments()
        .iter()
        .filter(|s| !segment_conforms(s))
        .filter_map(Segment::as_field)
        .collect()
}
