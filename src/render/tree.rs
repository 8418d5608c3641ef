//! render::tree
//!
//! Arena-backed render tree.
//!
//! Nodes live in a flat vector and refer to each other by [`NodeId`]. Parent
//! links make ancestor walks cheap, which is the only direction the resolver
//! ever needs.

use serde::Serialize;

/// Index of a node in its [`RenderTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// One rendered element.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub tag: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Raw field-marker text, unparsed.
    pub field_marker: Option<String>,
    /// Opaque object identity token.
    pub object_marker: Option<String>,
}

impl RenderNode {
    pub fn is_marked(&self) -> bool {
        self.field_marker.is_some() || self.object_marker.is_some()
    }
}

/// A rendered page as a tree of nodes.
///
/// # Example
///
/// ```
/// use annotrace::render::RenderTree;
///
/// let mut tree = RenderTree::new("main");
/// let section = tree.add_marked(tree.root(), "section", Some("sections.0"), None);
/// let heading = tree.add_marked(section, "h2", Some(".heading"), None);
///
/// assert_eq!(tree.ancestors(heading).collect::<Vec<_>>(), vec![section, tree.root()]);
/// assert_eq!(tree.location(heading), "main/section[0]/h2[0]");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    nodes: Vec<RenderNode>,
}

impl RenderTree {
    /// Create a tree with a single unmarked root.
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![RenderNode {
                tag: root_tag.to_string(),
                parent: None,
                children: Vec::new(),
                field_marker: None,
                object_marker: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    pub fn node(&self, id: NodeId) -> &RenderNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.get(id.0)
    }

    /// Append an unmarked child.
    pub fn add_child(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.add_marked(parent, tag, None, None)
    }

    /// Append a child carrying the given markers.
    pub fn add_marked(
        &mut self,
        parent: NodeId,
        tag: &str,
        field_marker: Option<&str>,
        object_marker: Option<&str>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RenderNode {
            tag: tag.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            field_marker: field_marker.map(str::to_string),
            object_marker: object_marker.map(str::to_string),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Set the markers of an existing node.
    pub fn set_markers(
        &mut self,
        id: NodeId,
        field_marker: Option<String>,
        object_marker: Option<String>,
    ) {
        let node = &mut self.nodes[id.0];
        node.field_marker = field_marker;
        node.object_marker = object_marker;
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.nodes[id.0].parent,
        }
    }

    /// All node ids in document (pre-)order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Human-readable trail to a node: `tag[i]` per level, where `i` is the
    /// node's position among its parent's children.
    pub fn location(&self, id: NodeId) -> String {
        let mut trail = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            let position = self.nodes[parent.0]
                .children
                .iter()
                .position(|c| *c == current)
                .unwrap_or(0);
            trail.push(format!("{}[{}]", self.nodes[current.0].tag, position));
            current = parent;
        }
        trail.push(self.nodes[current.0].tag.clone());
        trail.reverse();
        trail.join("/")
    }
}

/// Iterator over a node's ancestors.
pub struct Ancestors<'a> {
    tree: &'a RenderTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.nodes[id.0].parent;
        Some(id)
    }
}
