//! consistency
//!
//! Cross-checks the declared content model against itself and against what
//! was actually rendered.
//!
//! A declarations file lists, per content type, the schema fields, the query
//! projection that fetches them, and the editor model that exposes them for
//! visual editing. Any field one source knows about and another does not is
//! a place where an annotation silently goes missing.
//!
//! - [`declarations`] - Declarations file model, loading and validation
//! - [`query`] - Projection scanner for the query text
//! - [`checks`] - The per-type checks

pub mod checks;
pub mod declarations;
pub mod query;

pub use checks::{check, check_type};
pub use declarations::{ContentModel, DeclarationError, Declarations, Format};
pub use query::{parse_projection, Block, QueryError};
