//! core
//!
//! Core domain types and pure operations for annotrace.
//!
//! # Modules
//!
//! - [`types`] - Strong types: FieldPath, Segment, PathForm
//! - [`path`] - Path algebra: parse, join, lookup
//! - [`naming`] - Field naming rules
//! - [`document`] - The content document and its section variants
//! - [`config`] - Configuration schema and loading
//!
//! Nothing in this module touches the render tree; everything here is a pure
//! function of its inputs except document and config loading.

pub mod config;
pub mod document;
pub mod naming;
pub mod path;
pub mod types;
