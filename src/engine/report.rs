//! engine::report
//!
//! Violation records and the aggregate report.
//!
//! # Architecture
//!
//! Every check in the crate produces [`Violation`] values and never stops at
//! the first one. A run collects them into a [`Report`], which passes iff no
//! violations were found.
//!
//! Violations have stable, deterministic IDs computed from their kind,
//! location, expected and actual values, so the same defect keeps the same ID
//! across runs.
//!
//! # Example
//!
//! ```
//! use annotrace::engine::report::{Location, Report, Violation, ViolationKind};
//!
//! let violation = Violation::new(
//!     ViolationKind::ModelGap,
//!     Location::content_type("productCard"),
//!     "field 'ctaLabel' is not covered by the editor model",
//! )
//! .expected("ctaLabel")
//! .actual("missing");
//!
//! assert!(violation.id.as_str().starts_with("model-gap:"));
//!
//! let report = Report::new(vec![violation]);
//! assert!(!report.passed());
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What kind of defect a violation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// Section roots are misshapen, or out of document order.
    DocumentOrdering,
    /// A resolved marker path does not exist in the document.
    PathResolution,
    /// An item index is past the end of its list.
    OutOfBounds,
    /// A field-name segment breaks the naming rule.
    Naming,
    /// A node carries both a field marker and an object marker.
    MarkerConflict,
    /// A marker is malformed or sits outside any section root.
    Structural,
    /// A schema field is missing from the query projection.
    ProjectionGap,
    /// A schema field is missing from the editor model.
    ModelGap,
    /// A rendered type carries no field markers.
    RenderCoverage,
    /// An inner field of a list of records is not covered.
    NestedCoverage,
}

impl ViolationKind {
    /// All kinds, in report order.
    pub const ALL: [ViolationKind; 10] = [
        ViolationKind::DocumentOrdering,
        ViolationKind::PathResolution,
        ViolationKind::OutOfBounds,
        ViolationKind::Naming,
        ViolationKind::MarkerConflict,
        ViolationKind::Structural,
        ViolationKind::ProjectionGap,
        ViolationKind::ModelGap,
        ViolationKind::RenderCoverage,
        ViolationKind::NestedCoverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::DocumentOrdering => "document-ordering",
            ViolationKind::PathResolution => "path-resolution",
            ViolationKind::OutOfBounds => "out-of-bounds",
            ViolationKind::Naming => "naming",
            ViolationKind::MarkerConflict => "marker-conflict",
            ViolationKind::Structural => "structural",
            ViolationKind::ProjectionGap => "projection-gap",
            ViolationKind::ModelGap => "model-gap",
            ViolationKind::RenderCoverage => "render-coverage",
            ViolationKind::NestedCoverage => "nested-coverage",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stable, deterministic violation identifier.
///
/// Formatted as `kind:hash` where hash is a truncated SHA-256 of the
/// violation's key fields.
///
/// # Example
///
/// ```
/// use annotrace::engine::report::{ViolationId, ViolationKind};
///
/// let a = ViolationId::new(ViolationKind::Naming, "productCard|Item_Name");
/// let b = ViolationId::new(ViolationKind::Naming, "productCard|Item_Name");
/// assert_eq!(a, b);
/// assert!(a.as_str().starts_with("naming:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViolationId(String);

impl ViolationId {
    pub fn new(kind: ViolationKind, key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = hasher.finalize();
        Self(format!("{}:{}", kind, hex::encode(&hash[..4])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ViolationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a violation was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "kebab-case")]
pub enum Location {
    /// A node of a render tree.
    RenderNode {
        #[serde(skip_serializing_if = "Option::is_none")]
        page: Option<String>,
        /// Tag/child-index trail to the node.
        node: String,
        /// Path of the enclosing section root, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        section_root: Option<String>,
    },
    /// A declared content type.
    ContentType { name: String },
    /// A content document as a whole.
    Document {
        #[serde(skip_serializing_if = "Option::is_none")]
        page: Option<String>,
    },
}

impl Location {
    pub fn node(node: impl Into<String>, section_root: Option<String>) -> Self {
        Location::RenderNode {
            page: None,
            node: node.into(),
            section_root,
        }
    }

    pub fn content_type(name: impl Into<String>) -> Self {
        Location::ContentType { name: name.into() }
    }

    pub fn document() -> Self {
        Location::Document { page: None }
    }

    fn set_page(&mut self, label: &str) {
        match self {
            Location::RenderNode { page, .. } | Location::Document { page } => {
                *page = Some(label.to_string())
            }
            Location::ContentType { .. } => {}
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::RenderNode {
                page,
                node,
                section_root,
            } => {
                if let Some(page) = page {
                    write!(f, "{}: ", page)?;
                }
                write!(f, "{}", node)?;
                if let Some(root) = section_root {
                    write!(f, " (root {})", root)?;
                }
                Ok(())
            }
            Location::ContentType { name } => write!(f, "type {}", name),
            Location::Document { page: Some(page) } => write!(f, "document {}", page),
            Location::Document { page: None } => write!(f, "document"),
        }
    }
}

/// One defect found by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub id: ViolationId,
    pub kind: ViolationKind,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, location: Location, message: impl Into<String>) -> Self {
        let mut violation = Self {
            id: ViolationId::new(kind, ""),
            kind,
            location,
            expected: None,
            actual: None,
            message: message.into(),
        };
        violation.refresh_id();
        violation
    }

    /// Set what the check expected to find.
    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.refresh_id();
        self
    }

    /// Set what the check actually found.
    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self.refresh_id();
        self
    }

    /// Attach the page label to a render-node or document location.
    pub fn on_page(mut self, page: &str) -> Self {
        self.location.set_page(page);
        self.refresh_id();
        self
    }

    fn refresh_id(&mut self) {
        let key = format!(
            "{}|{}|{}|{}",
            self.location,
            self.expected.as_deref().unwrap_or(""),
            self.actual.as_deref().unwrap_or(""),
            self.message
        );
        self.id = ViolationId::new(self.kind, &key);
    }
}

/// The outcome of a run.
#[derive(Debug, Clone)]
pub struct Report {
    violations: Vec<Violation>,
    generated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self {
            violations,
            generated_at: Utc::now(),
        }
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// The report passes iff there are no violations.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self) -> usize {
        self.violations.len()
    }

    /// Violation counts per kind; kinds with no violations are omitted.
    pub fn count_by_kind(&self) -> BTreeMap<ViolationKind, usize> {
        let mut counts = BTreeMap::new();
        for v in &self.violations {
            *counts.entry(v.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Format the report for terminal display.
    pub fn format(&self) -> String {
        if self.passed() {
            return "PASS: no violations".to_string();
        }

        let summary = self
            .count_by_kind()
            .iter()
            .map(|(kind, n)| format!("{} {}", n, kind))
            .collect::<Vec<_>>()
            .join(", ");

        let mut lines = vec![
            format!("FAIL: {} violation(s) ({})", self.count(), summary),
            String::new(),
        ];

        for v in &self.violations {
            lines.push(format!("[{}] {}", v.kind, v.location));
            lines.push(format!("  {}", v.message));
            if let Some(expected) = &v.expected {
                lines.push(format!("  expected: {}", expected));
            }
            if let Some(actual) = &v.actual {
                lines.push(format!("  actual:   {}", actual));
            }
            lines.push(String::new());
        }

        lines.pop();
        lines.join("\n")
    }

    /// Machine-readable form of the report.
    pub fn to_json(&self) -> serde_json::Value {
        let counts: BTreeMap<&str, usize> = self
            .count_by_kind()
            .into_iter()
            .map(|(k, n)| (k.as_str(), n))
            .collect();

        serde_json::json!({
            "passed": self.passed(),
            "generated_at": self.generated_at.to_rfc3339(),
            "counts": counts,
            "violations": self.violations,
        })
    }
}
