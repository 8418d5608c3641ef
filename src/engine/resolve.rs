//! engine::resolve
//!
//! Ancestor-chain resolution of relative field markers.
//!
//! # Algorithm
//!
//! A relative marker means nothing on its own; `.name` is only a document
//! location once the markers above it are known. Given a marked node `N`:
//!
//! 1. Find the section root `R`: the nearest strict ancestor whose field marker
//!    is absolute. Ancestors that restate the same absolute path collapse into
//!    the outermost one.
//! 2. Collect the field-marker segments of every ancestor strictly between `R`
//!    and `N`, root side first.
//! 3. Pair each field name with a directly following index into one array
//!    step. Unpaired names and indices stay as plain steps.
//! 4. If `N`'s own marker starts with an index, the nearest ancestor whose
//!    marker is a single field name is the implicit container.
//! 5. The effective path is the steps followed by `N`'s remaining segments,
//!    joined onto `R`'s path.
//!
//! The result depends only on the marker strings between `R` and `N`.
//!
//! # Example
//!
//! ```
//! use annotrace::engine::resolve::resolve;
//! use annotrace::render::RenderTree;
//!
//! let mut tree = RenderTree::new("main");
//! let section = tree.add_marked(tree.root(), "section", Some("sections.0"), None);
//! let list = tree.add_marked(section, "ul", Some(".items"), None);
//! let item = tree.add_marked(list, "li", Some(".1"), None);
//! let name = tree.add_marked(item, "h3", Some(".name"), None);
//!
//! let resolution = resolve(&tree, name).unwrap();
//! assert_eq!(resolution.absolute.to_string(), "sections.0.items.1.name");
//! assert!(!resolution.ambiguous);
//! ```

use thiserror::Error;

use crate::core::path::join;
use crate::core::types::{FieldPath, PathError, Segment};
use crate::render::{NodeId, RenderTree};

/// Errors from resolving a single marker.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    #[error("node has no field marker")]
    Unmarked,

    #[error("no enclosing section root")]
    OutsideSectionRoot,

    #[error("malformed marker '{marker}': {source}")]
    MalformedMarker {
        node: NodeId,
        marker: String,
        source: PathError,
    },
}

/// One step of an effective path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A field name paired with the index that followed it.
    Array { field: String, index: usize },
    /// An unpaired field name.
    Field(String),
    /// An unpaired index.
    Index(usize),
}

impl Step {
    fn push_segments(&self, out: &mut Vec<Segment>) {
        match self {
            Step::Array { field, index } => {
                out.push(Segment::Field(field.clone()));
                out.push(Segment::Index(*index));
            }
            Step::Field(name) => out.push(Segment::Field(name.clone())),
            Step::Index(i) => out.push(Segment::Index(*i)),
        }
    }
}

/// The enclosing section root of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRoot {
    pub node: NodeId,
    pub path: FieldPath,
}

/// A resolved marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub root: SectionRoot,
    /// The node's own marker.
    pub own: FieldPath,
    /// Relative path from the section root.
    pub effective: FieldPath,
    /// `root.path` joined with `effective`.
    pub absolute: FieldPath,
    /// Container name supplied for a marker that starts with an index.
    pub inferred_container: Option<String>,
    /// The implicit container was not the nearest marked ancestor, so a
    /// different reading of the chain was possible.
    pub ambiguous: bool,
}

fn parse_marker(tree: &RenderTree, id: NodeId) -> Result<Option<FieldPath>, ResolveError> {
    match tree.node(id).field_marker.as_deref() {
        None => Ok(None),
        Some(text) => FieldPath::parse(text)
            .map(Some)
            .map_err(|source| ResolveError::MalformedMarker {
                node: id,
                marker: text.to_string(),
                source,
            }),
    }
}

/// Find the section root enclosing `id` (strict ancestors only).
///
/// Returns `Ok(None)` when no ancestor carries an absolute marker.
///
/// # Errors
///
/// Returns [`ResolveError::MalformedMarker`] if an ancestor's marker does not
/// parse before a root is found.
pub fn section_root(tree: &RenderTree, id: NodeId) -> Result<Option<SectionRoot>, ResolveError> {
    let mut ancestors = tree.ancestors(id);

    let mut root = loop {
        let Some(ancestor) = ancestors.next() else {
            return Ok(None);
        };
        if let Some(path) = parse_marker(tree, ancestor)? {
            if path.is_absolute() {
                break SectionRoot {
                    node: ancestor,
                    path,
                };
            }
        }
    };

    // Outer restatements of the same root path win.
    for ancestor in ancestors {
        let restated = matches!(
            tree.node(ancestor).field_marker.as_deref(),
            Some(text) if FieldPath::parse(text).ok().as_ref() == Some(&root.path)
        );
        if restated {
            root.node = ancestor;
        }
    }

    Ok(Some(root))
}

/// Check whether `id` carries an absolute marker that merely restates the
/// path of an enclosing root.
pub fn is_restated_root(tree: &RenderTree, id: NodeId) -> bool {
    let Some(Ok(path)) = tree.node(id).field_marker.as_deref().map(FieldPath::parse) else {
        return false;
    };
    path.is_absolute()
        && tree.ancestors(id).any(|a| {
            tree.node(a).field_marker.as_deref().map(FieldPath::parse) == Some(Ok(path.clone()))
        })
}

/// Pair field names with directly following indices.
pub fn pair_steps(segments: &[Segment]) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut i = 0;
    while i < segments.len() {
        match (&segments[i], segments.get(i + 1)) {
            (Segment::Field(field), Some(Segment::Index(index))) => {
                steps.push(Step::Array {
                    field: field.clone(),
                    index: *index,
                });
                i += 2;
            }
            (Segment::Field(field), _) => {
                steps.push(Step::Field(field.clone()));
                i += 1;
            }
            (Segment::Index(index), _) => {
                steps.push(Step::Index(*index));
                i += 1;
            }
        }
    }
    steps
}

/// Resolve the field marker on `id` to an absolute document path.
///
/// # Errors
///
/// - [`ResolveError::Unmarked`] if `id` has no field marker
/// - [`ResolveError::MalformedMarker`] if any marker on the chain fails to parse
/// - [`ResolveError::OutsideSectionRoot`] if no ancestor is a section root
pub fn resolve(tree: &RenderTree, id: NodeId) -> Result<Resolution, ResolveError> {
    let own = parse_marker(tree, id)?.ok_or(ResolveError::Unmarked)?;
    let root = section_root(tree, id)?.ok_or(ResolveError::OutsideSectionRoot)?;

    // Marked ancestors strictly between the root and the node, nearest first.
    let mut chain: Vec<(NodeId, FieldPath)> = Vec::new();
    for ancestor in tree.ancestors(id) {
        if ancestor == root.node {
            break;
        }
        if let Some(path) = parse_marker(tree, ancestor)? {
            if path != root.path {
                chain.push((ancestor, path));
            }
        }
    }

    let collected: Vec<Segment> = chain
        .iter()
        .rev()
        .flat_map(|(_, path)| path.segments().iter().cloned())
        .collect();
    let mut steps = pair_steps(&collected);

    let mut remaining = own.segments();
    let mut inferred_container = None;
    let mut ambiguous = false;

    if let Some(Segment::Index(index)) = own.first() {
        let container = chain.iter().enumerate().find_map(|(depth, (_, path))| {
            match path.segments() {
                [Segment::Field(name)] => Some((depth, name.clone())),
                _ => None,
            }
        });

        if let Some((depth, name)) = container {
            match steps.last_mut() {
                Some(last) if *last == Step::Field(name.clone()) => {
                    *last = Step::Array {
                        field: name.clone(),
                        index: *index,
                    };
                }
                _ => {
                    steps.push(Step::Array {
                        field: name.clone(),
                        index: *index,
                    });
                    ambiguous = depth != 0;
                }
            }
            remaining = &remaining[1..];
            inferred_container = Some(name);
        }
    }

    let mut segments = Vec::new();
    for step in &steps {
        step.push_segments(&mut segments);
    }
    segments.extend(remaining.iter().cloned());

    let effective = FieldPath::relative(segments);
    let absolute = join(&root.path, &effective).map_err(|source| ResolveError::MalformedMarker {
        node: id,
        marker: own.to_string(),
        source,
    })?;

    Ok(Resolution {
        root,
        own,
        effective,
        absolute,
        inferred_container,
        ambiguous,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg_f(name: &str) -> Segment {
        Segment::Field(name.to_string())
    }

    fn with_section() -> (RenderTree, NodeId) {
        let mut tree = RenderTree::new("main");
        let section = tree.add_marked(tree.root(), "section", Some("sections.0"), None);
        (tree, section)
    }

    mod pairing {
        use super::*;

        #[test]
        fn field_then_index_is_array_step() {
            let steps = pair_steps(&[seg_f("items"), Segment::Index(2), seg_f("name")]);
            assert_eq!(
                steps,
                vec![
                    Step::Array {
                        field: "items".into(),
                        index: 2
                    },
                    Step::Field("name".into()),
                ]
            );
        }

        #[test]
        fn unpaired_index_kept() {
            let steps = pair_steps(&[Segment::Index(0), Segment::Index(1)]);
            assert_eq!(steps, vec![Step::Index(0), Step::Index(1)]);
        }
    }

    mod chain {
        use super::*;

        #[test]
        fn direct_child_of_root() {
            let (mut tree, section) = with_section();
            let h2 = tree.add_marked(section, "h2", Some(".heading"), None);
            let r = resolve(&tree, h2).unwrap();
            assert_eq!(r.absolute.to_string(), "sections.0.heading");
            assert_eq!(r.effective.to_string(), ".heading");
            assert_eq!(r.root.node, section);
        }

        #[test]
        fn unmarked_wrappers_ignored() {
            let (mut tree, section) = with_section();
            let div = tree.add_child(section, "div");
            let inner = tree.add_child(div, "div");
            let h2 = tree.add_marked(inner, "h2", Some(".heading"), None);
            assert_eq!(resolve(&tree, h2).unwrap().absolute.to_string(), "sections.0.heading");
        }

        #[test]
        fn item_index_promotes_container() {
            let (mut tree, section) = with_section();
            let ul = tree.add_marked(section, "ul", Some(".items"), None);
            let li = tree.add_marked(ul, "li", Some(".1"), None);
            let r = resolve(&tree, li).unwrap();
            assert_eq!(r.absolute.to_string(), "sections.0.items.1");
            assert_eq!(r.inferred_container.as_deref(), Some("items"));
            assert!(!r.ambiguous);
        }

        #[test]
        fn descendant_of_item() {
            let (mut tree, section) = with_section();
            let ul = tree.add_marked(section, "ul", Some(".banners"), None);
            let li = tree.add_marked(ul, "li", Some(".0"), None);
            let wrapper = tree.add_child(li, "div");
            let title = tree.add_marked(wrapper, "h1", Some(".title"), None);
            let r = resolve(&tree, title).unwrap();
            assert_eq!(r.absolute.to_string(), "sections.0.banners.0.title");
            assert!(r.inferred_container.is_none());
        }

        #[test]
        fn multi_segment_markers_concatenate() {
            let (mut tree, section) = with_section();
            let li = tree.add_marked(section, "li", Some(".items.3"), None);
            let img = tree.add_marked(li, "div", Some(".image"), None);
            let r = resolve(&tree, img).unwrap();
            assert_eq!(r.absolute.to_string(), "sections.0.items.3.image");
        }

        #[test]
        fn nested_lists() {
            let (mut tree, section) = with_section();
            let stories = tree.add_marked(section, "div", Some(".items"), None);
            let story = tree.add_marked(stories, "div", Some(".2"), None);
            let slides = tree.add_marked(story, "div", Some(".slides"), None);
            let slide = tree.add_marked(slides, "div", Some(".0"), None);
            let text = tree.add_marked(slide, "p", Some(".text"), None);
            let r = resolve(&tree, text).unwrap();
            assert_eq!(r.absolute.to_string(), "sections.0.items.2.slides.0.text");
        }

        #[test]
        fn restated_root_ignored() {
            let (mut tree, section) = with_section();
            let inner = tree.add_marked(section, "div", Some("sections.0"), None);
            let h2 = tree.add_marked(inner, "h2", Some(".heading"), None);
            let r = resolve(&tree, h2).unwrap();
            assert_eq!(r.root.node, section);
            assert_eq!(r.absolute.to_string(), "sections.0.heading");
            assert!(is_restated_root(&tree, inner));
            assert!(!is_restated_root(&tree, section));
        }

        #[test]
        fn object_markers_ignored() {
            let (mut tree, section) = with_section();
            let wrap = tree.add_marked(section, "div", Some(".image"), None);
            let img = tree.add_marked(wrap, "img", None, Some("img-1"));
            let alt = tree.add_marked(img, "span", Some(".alt"), None);
            assert_eq!(resolve(&tree, alt).unwrap().absolute.to_string(), "sections.0.image.alt");
        }

        #[test]
        fn absolute_marker_deeper_acts_as_root() {
            let (mut tree, section) = with_section();
            let other = tree.add_marked(section, "div", Some("sections.4"), None);
            let h2 = tree.add_marked(other, "h2", Some(".heading"), None);
            let r = resolve(&tree, h2).unwrap();
            assert_eq!(r.root.node, other);
            assert_eq!(r.absolute.to_string(), "sections.4.heading");
        }
    }

    mod ambiguity {
        use super::*;

        #[test]
        fn index_under_item_appends_container_step() {
            let (mut tree, section) = with_section();
            let list = tree.add_marked(section, "ul", Some(".items"), None);
            let item = tree.add_marked(list, "li", Some(".0"), None);
            let wrapper = tree.add_child(item, "div");
            let inner = tree.add_marked(wrapper, "span", Some(".1"), None);

            let r = resolve(&tree, inner).unwrap();
            assert_eq!(r.absolute.to_string(), "sections.0.items.0.items.1");
            assert_eq!(r.inferred_container.as_deref(), Some("items"));
            assert!(r.ambiguous);
        }

        #[test]
        fn index_without_container_stays_bare() {
            let (mut tree, section) = with_section();
            let li = tree.add_marked(section, "li", Some(".0"), None);
            let r = resolve(&tree, li).unwrap();
            assert_eq!(r.absolute.to_string(), "sections.0.0");
            assert!(r.inferred_container.is_none());
            assert!(!r.ambiguous);
        }
    }

    mod failures {
        use super::*;

        #[test]
        fn outside_section_root() {
            let mut tree = RenderTree::new("main");
            let h2 = tree.add_marked(tree.root(), "h2", Some(".heading"), None);
            assert_eq!(resolve(&tree, h2), Err(ResolveError::OutsideSectionRoot));
        }

        #[test]
        fn malformed_ancestor() {
            let (mut tree, section) = with_section();
            let bad = tree.add_marked(section, "ul", Some(".items..x"), None);
            let li = tree.add_marked(bad, "li", Some(".0"), None);
            assert!(matches!(
                resolve(&tree, li),
                Err(ResolveError::MalformedMarker { node, .. }) if node == bad
            ));
        }

        #[test]
        fn unmarked_node() {
            let (mut tree, section) = with_section();
            let div = tree.add_child(section, "div");
            assert_eq!(resolve(&tree, div), Err(ResolveError::Unmarked));
        }
    }
}
