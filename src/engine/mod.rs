//! engine
//!
//! Render-side checks: resolve markers, validate them, and report.
//!
//! # Architecture
//!
//! ```text
//! RenderTree ──resolve──▶ absolute paths ──validate──▶ Violations ──▶ Report
//!                                ▲
//!                       ContentDocument
//! ```
//!
//! - [`resolve`] - Turns a relative marker into a document path using only the
//!   markers on its ancestor chain
//! - [`validate`] - Runs the structural, bounds, existence and naming checks
//!   over a whole page
//! - [`report`] - Violation records, stable IDs, and the pass/fail report
//!
//! # Invariants
//!
//! - Checks are pure functions of the document and the tree
//! - Every defect is reported; nothing stops at the first violation
//! - Violation IDs are stable across runs for the same defect

pub mod report;
pub mod resolve;
pub mod validate;

pub use report::{Location, Report, Violation, ViolationId, ViolationKind};
pub use resolve::{resolve, Resolution, ResolveError};
pub use validate::{validate, ObservedMarker, ResolvedMarker, Validation};
