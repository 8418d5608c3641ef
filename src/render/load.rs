//! render::load
//!
//! Read a render tree from its JSON serialization.
//!
//! # Format
//!
//! ```json
//! {
//!   "tag": "main",
//!   "attrs": {},
//!   "children": [
//!     { "tag": "section", "attrs": { "data-sb-field-path": "sections.0" }, "children": [
//!         { "tag": "h2", "attrs": { "data-sb-field-path": ".heading" }, "children": ["Shop"] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Text children are accepted and dropped; only elements become nodes.
//! Attributes other than the two marker attributes are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::tree::{NodeId, RenderTree};
use crate::core::config::schema::{DEFAULT_FIELD_ATTRIBUTE, DEFAULT_OBJECT_ATTRIBUTE};
use crate::core::config::Config;

/// Errors from loading a render tree.
#[derive(Debug, Error)]
pub enum RenderTreeError {
    #[error("failed to read render tree '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse render tree '{origin}': {message}")]
    Parse { origin: String, message: String },

    #[error("attribute '{attribute}' on {location} must be a string")]
    NonStringMarker { location: String, attribute: String },
}

/// Names of the attributes that carry markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerAttributes {
    pub field: String,
    pub object: String,
}

impl Default for MarkerAttributes {
    fn default() -> Self {
        Self {
            field: DEFAULT_FIELD_ATTRIBUTE.to_string(),
            object: DEFAULT_OBJECT_ATTRIBUTE.to_string(),
        }
    }
}

impl MarkerAttributes {
    /// Marker attribute names as configured.
    pub fn from_config(config: &Config) -> Self {
        Self {
            field: config.field_attribute().to_string(),
            object: config.object_attribute().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Element {
    tag: String,
    #[serde(default)]
    attrs: BTreeMap<String, Value>,
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Child {
    Element(Element),
    Text(String),
}

/// Read a render tree from a file.
pub fn load(path: &Path, markers: &MarkerAttributes) -> Result<RenderTree, RenderTreeError> {
    let text = fs::read_to_string(path).map_err(|source| RenderTreeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    from_json_str(&text, &path.display().to_string(), markers)
}

/// Parse a render tree from JSON text.
pub fn from_json_str(
    text: &str,
    origin: &str,
    markers: &MarkerAttributes,
) -> Result<RenderTree, RenderTreeError> {
    let root: Element = serde_json::from_str(text).map_err(|e| RenderTreeError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;

    let mut tree = RenderTree::new(&root.tag);
    let root_id = tree.root();
    attach(&mut tree, root_id, root, markers)?;
    Ok(tree)
}

fn attach(
    tree: &mut RenderTree,
    id: NodeId,
    element: Element,
    markers: &MarkerAttributes,
) -> Result<(), RenderTreeError> {
    let field = marker_value(tree, id, &element.attrs, &markers.field)?;
    let object = marker_value(tree, id, &element.attrs, &markers.object)?;
    tree.set_markers(id, field, object);

    for child in element.children {
        if let Child::Element(child) = child {
            let child_id = tree.add_child(id, &child.tag);
            attach(tree, child_id, child, markers)?;
        }
    }
    Ok(())
}

fn marker_value(
    tree: &RenderTree,
    id: NodeId,
    attrs: &BTreeMap<String, Value>,
    name: &str,
) -> Result<Option<String>, RenderTreeError> {
    match attrs.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(RenderTreeError::NonStringMarker {
            location: tree.location(id),
            attribute: name.to_string(),
        }),
    }
}
