//! ui
//!
//! Terminal output.
//!
//! # Modules
//!
//! - [`output`] - Verbosity-aware printing and formatting helpers
//!
//! All command output goes through this module so `--quiet` and `--debug`
//! behave the same everywhere.

pub mod output;
