//! Annotrace - checks visual-editing annotations against content
//!
//! A page renders content fetched from a headless CMS and tags its elements
//! with field-path markers so a visual editor can map each element back to
//! the field it shows. Annotrace verifies those markers: that every marker
//! resolves to an existing field of the page's content document, that section
//! roots and list indices line up with the document, that field names follow
//! the naming rule, and that the content model's schema, query projection and
//! editor model agree with each other.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (reads inputs, runs checks)
//! - [`core`] - Path algebra, naming rule, content documents, configuration
//! - [`render`] - Render tree arena and its loader
//! - [`engine`] - Marker resolution, validation, and reports
//! - [`consistency`] - Content model declarations and cross-checks
//! - [`ui`] - Terminal output
//!
//! # Correctness Invariants
//!
//! 1. Parsing a path and printing it yields the same text
//! 2. A marker's absolute path depends only on its ancestor chain
//! 3. Checks accumulate every violation instead of stopping at the first
//! 4. The same defect gets the same violation ID on every run

pub mod cli;
pub mod consistency;
pub mod core;
pub mod engine;
pub mod render;
pub mod ui;
