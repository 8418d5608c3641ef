//! render
//!
//! The rendered page: a tree of elements, some carrying markers.
//!
//! # Modules
//!
//! - [`tree`] - Arena-backed tree with ancestor walks
//! - [`load`] - JSON serialization reader
//!
//! Markers are stored as raw strings. Parsing happens in the resolver so a
//! malformed marker becomes a reported violation rather than a load failure.

pub mod load;
pub mod tree;

pub use load::{MarkerAttributes, RenderTreeError};
pub use tree::{NodeId, RenderNode, RenderTree};
