//! engine::validate
//!
//! Existence and bounds validation of one (document, render tree) pair.
//!
//! # Checks
//!
//! - **Marker conflict**: a node carries both a field and an object marker
//! - **Section roots**: roots are `sections.<i>` and appear as `0..N-1`
//! - **Bounds**: item indices fall inside their list
//! - **Resolution**: every other marker resolves to an existing location
//! - **Naming**: every field-name segment is camelCase
//!
//! Every check runs to completion; the result is the full list of
//! violations, never just the first.
//!
//! Besides violations, validation reports every resolved marker and the
//! markers observed per content type: under each section `_type`, and under
//! the `_type` of the innermost list item that names one. A marker that points
//! at the item itself counts as that item's root.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use super::report::{Location, Violation, ViolationKind};
use super::resolve::{self, ResolveError};
use crate::core::document::ContentDocument;
use crate::core::naming;
use crate::core::path::{get, Lookup, Miss};
use crate::core::types::{FieldPath, Segment};
use crate::render::{NodeId, RenderTree};

/// A marker with its resolved location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMarker {
    #[serde(skip)]
    pub node: NodeId,
    /// Tag/child-index trail to the node.
    pub location: String,
    pub marker: String,
    pub section_root: FieldPath,
    pub absolute: FieldPath,
    pub found: bool,
    pub ambiguous: bool,
}

/// A field marker seen under a section of some `_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedMarker {
    pub path: FieldPath,
    pub is_root: bool,
    pub location: String,
}

/// Result of validating one page.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub violations: Vec<Violation>,
    pub resolved: Vec<ResolvedMarker>,
    /// Observed field markers keyed by section `_type`.
    pub observed: BTreeMap<String, Vec<ObservedMarker>>,
}

impl Validation {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Resolutions that relied on the ambiguous container heuristic.
    pub fn ambiguous(&self) -> impl Iterator<Item = &ResolvedMarker> {
        self.resolved.iter().filter(|r| r.ambiguous)
    }
}

/// Validate a render tree against its content document.
///
/// # Example
///
/// ```
/// use annotrace::core::document::ContentDocument;
/// use annotrace::engine::validate::validate;
/// use annotrace::engine::report::ViolationKind;
/// use annotrace::render::RenderTree;
///
/// let doc = ContentDocument::from_json_str(
///     r#"{ "sections": [{ "_type": "categoriesSection", "heading": "Shop" }] }"#,
///     "inline",
/// )
/// .unwrap();
///
/// let mut tree = RenderTree::new("main");
/// let section = tree.add_marked(tree.root(), "section", Some("sections.0"), None);
/// tree.add_marked(section, "h2", Some(".heading"), None);
/// tree.add_marked(section, "p", Some(".subtitle"), None);
///
/// let result = validate(&doc, &tree);
/// assert_eq!(result.violations.len(), 1);
/// assert_eq!(result.violations[0].kind, ViolationKind::PathResolution);
/// ```
pub fn validate(document: &ContentDocument, tree: &RenderTree) -> Validation {
    let mut v = Validator {
        document,
        tree,
        result: Validation::default(),
        roots: Vec::new(),
        bounded: BTreeSet::new(),
    };
    for id in tree.preorder() {
        v.visit(id);
    }
    v.check_root_order();
    v.result
}

struct Validator<'a> {
    document: &'a ContentDocument,
    tree: &'a RenderTree,
    result: Validation,
    /// Section roots in render order.
    roots: Vec<(NodeId, FieldPath)>,
    /// Containers already reported out of bounds.
    bounded: BTreeSet<FieldPath>,
}

impl Validator<'_> {
    fn visit(&mut self, id: NodeId) {
        let tree = self.tree;
        let node = tree.node(id);
        let location = tree.location(id);

        if let (Some(field), Some(object)) = (&node.field_marker, &node.object_marker) {
            self.push(
                Violation::new(
                    ViolationKind::MarkerConflict,
                    Location::node(location.clone(), self.root_label(id)),
                    "node carries both a field marker and an object marker",
                )
                .expected("one marker")
                .actual(format!("field '{}', object '{}'", field, object)),
            );
        }

        let Some(text) = node.field_marker.as_deref() else {
            return;
        };

        let path = match FieldPath::parse(text) {
            Ok(path) => path,
            Err(e) => {
                self.push(
                    Violation::new(
                        ViolationKind::Structural,
                        Location::node(location, self.root_label(id)),
                        format!("marker does not parse: {}", e),
                    )
                    .expected("a dotted field path")
                    .actual(text),
                );
                return;
            }
        };

        for segment in naming::nonconforming_segments(&path) {
            self.push(
                Violation::new(
                    ViolationKind::Naming,
                    Location::node(location.clone(), self.root_label(id)),
                    format!("field name '{}' in marker '{}' is not camelCase", segment, path),
                )
                .expected("camelCase field name")
                .actual(segment),
            );
        }

        if path.is_absolute() {
            self.visit_root(id, path, location);
        } else {
            self.visit_relative(id, path, location);
        }
    }

    fn visit_root(&mut self, id: NodeId, path: FieldPath, location: String) {
        if resolve::is_restated_root(self.tree, id) {
            return;
        }

        if path.section_index().is_none() {
            self.push(
                Violation::new(
                    ViolationKind::DocumentOrdering,
                    Location::node(location.clone(), None),
                    format!("section root marker '{}' is not of the form sections.<i>", path),
                )
                .expected("sections.<i>")
                .actual(path.to_string()),
            );
        }

        self.observe(&path, ObservedMarker {
            path: path.clone(),
            is_root: true,
            location,
        });
        self.roots.push((id, path));
    }

    fn visit_relative(&mut self, id: NodeId, path: FieldPath, location: String) {
        let resolution = match resolve::resolve(self.tree, id) {
            Ok(r) => r,
            Err(ResolveError::OutsideSectionRoot) => {
                self.push(
                    Violation::new(
                        ViolationKind::Structural,
                        Location::node(location, None),
                        format!("relative marker '{}' has no enclosing section root", path),
                    )
                    .expected("an ancestor marked sections.<i>")
                    .actual("none"),
                );
                return;
            }
            // The ancestor's own marker is reported where it sits.
            Err(ResolveError::MalformedMarker { .. }) | Err(ResolveError::Unmarked) => return,
        };

        let document = self.document;
        let root_label = Some(resolution.root.path.to_string());
        let lookup = get(document.raw(), &resolution.absolute);
        let found = lookup.is_found();

        match lookup {
            Lookup::Found(_) => {}
            Lookup::NotFound { at_segment, miss } => {
                if let Some(Segment::Index(index)) = resolution.absolute.segments().get(at_segment) {
                    let container = resolution.absolute.prefix(at_segment);
                    if self.bounded.insert(container.clone()) {
                        let violation = self.out_of_bounds(
                            &container,
                            *index,
                            miss,
                            location.clone(),
                            root_label.clone(),
                        );
                        self.push(violation);
                    }
                } else {
                    let missing = resolution
                        .absolute
                        .segments()
                        .get(at_segment)
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    self.push(
                        Violation::new(
                            ViolationKind::PathResolution,
                            Location::node(location.clone(), root_label),
                            format!(
                                "marker '{}' resolves to {} which is not in the document",
                                path, resolution.absolute
                            ),
                        )
                        .expected(resolution.absolute.to_string())
                        .actual(format!(
                            "{} at '{}' ({})",
                            describe_miss(miss),
                            missing,
                            resolution.absolute.prefix(at_segment + 1)
                        )),
                    );
                }
            }
        }

        if let Some(index) = resolution.root.path.section_index() {
            self.observe_at(index, ObservedMarker {
                path: path.clone(),
                is_root: false,
                location: location.clone(),
            });
        }

        let root_len = resolution.root.path.len();
        if let Some((type_name, depth)) =
            record_type(document.raw(), &resolution.absolute, root_len)
        {
            self.result
                .observed
                .entry(type_name.to_string())
                .or_default()
                .push(ObservedMarker {
                    path: path.clone(),
                    is_root: depth == resolution.absolute.len(),
                    location: location.clone(),
                });
        }

        self.result.resolved.push(ResolvedMarker {
            node: id,
            location,
            marker: path.to_string(),
            section_root: resolution.root.path,
            absolute: resolution.absolute,
            found,
            ambiguous: resolution.ambiguous,
        });
    }

    fn out_of_bounds(
        &self,
        container: &FieldPath,
        index: usize,
        miss: Miss,
        location: String,
        root_label: Option<String>,
    ) -> Violation {
        let loc = Location::node(location, root_label);
        match get(self.document.raw(), container).value().and_then(|v| v.as_array()) {
            Some(list) => Violation::new(
                ViolationKind::OutOfBounds,
                loc,
                format!(
                    "index {} is out of range for {} (length {})",
                    index,
                    container,
                    list.len()
                ),
            )
            .expected(format!("index < {}", list.len()))
            .actual(index.to_string()),
            None => Violation::new(
                ViolationKind::OutOfBounds,
                loc,
                format!("{} is not an ordered list; cannot index it with {}", container, index),
            )
            .expected("an ordered list")
            .actual(describe_miss(miss)),
        }
    }

    fn check_root_order(&mut self) {
        let n = self.document.section_count();
        let actual: Vec<usize> = self
            .roots
            .iter()
            .filter_map(|(_, path)| path.section_index())
            .collect();
        let expected: Vec<usize> = (0..n).collect();

        if actual == expected {
            return;
        }

        let mut seen = BTreeSet::new();
        let duplicates: BTreeSet<usize> = actual
            .iter()
            .copied()
            .filter(|i| !seen.insert(*i))
            .collect();
        let missing: Vec<usize> = expected
            .iter()
            .copied()
            .filter(|i| !seen.contains(i))
            .collect();
        let extra: Vec<usize> = seen.iter().copied().filter(|i| *i >= n).collect();
        let misplaced: Vec<usize> = actual
            .iter()
            .enumerate()
            .filter(|(pos, i)| **i < n && *pos != **i && !duplicates.contains(*i))
            .map(|(_, i)| *i)
            .collect();

        let mut problems = Vec::new();
        if !duplicates.is_empty() {
            problems.push(format!("duplicated {}", join(duplicates.iter())));
        }
        if !missing.is_empty() {
            problems.push(format!("missing {}", join(missing.iter())));
        }
        if !extra.is_empty() {
            problems.push(format!("beyond the {} document sections {}", n, join(extra.iter())));
        }
        if !misplaced.is_empty() {
            problems.push(format!("out of order {}", join(misplaced.iter())));
        }

        self.push(
            Violation::new(
                ViolationKind::DocumentOrdering,
                Location::document(),
                format!("section roots do not match document order: {}", problems.join("; ")),
            )
            .expected(format!("[{}]", join(expected.iter())))
            .actual(format!("[{}]", join(actual.iter()))),
        );
    }

    fn observe(&mut self, path: &FieldPath, marker: ObservedMarker) {
        if let Some(index) = path.section_index() {
            self.observe_at(index, marker);
        }
    }

    fn observe_at(&mut self, section: usize, marker: ObservedMarker) {
        if let Some(type_name) = self.document.section_type(section) {
            self.result
                .observed
                .entry(type_name.to_string())
                .or_default()
                .push(marker);
        }
    }

    fn root_label(&self, id: NodeId) -> Option<String> {
        resolve::section_root(self.tree, id)
            .ok()
            .flatten()
            .map(|root| root.path.to_string())
    }

    fn push(&mut self, violation: Violation) {
        self.result.violations.push(violation);
    }
}

/// The innermost list item on `absolute`, below the section root, that names
/// its own `_type`. Returns the type and the length of the item's path.
fn record_type<'d>(
    raw: &'d Value,
    absolute: &FieldPath,
    root_len: usize,
) -> Option<(&'d str, usize)> {
    let segments = absolute.segments();
    (root_len..segments.len())
        .rev()
        .filter(|&i| matches!(segments[i], Segment::Index(_)))
        .find_map(|i| {
            let item = get(raw, &absolute.prefix(i + 1)).value()?;
            item.get("_type")?.as_str().map(|t| (t, i + 1))
        })
}

fn describe_miss(miss: Miss) -> &'static str {
    match miss {
        Miss::MissingField => "missing field",
        Miss::IndexOutOfRange => "index out of range",
        Miss::TypeMismatch => "type mismatch",
    }
}

fn join<'a>(items: impl Iterator<Item = &'a usize>) -> String {
    items.map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
