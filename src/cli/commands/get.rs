//! get command - Look up an absolute path in a content document

use std::path::Path;

use super::inputs;
use crate::cli::{Context, EXIT_VIOLATIONS};
use crate::core::path::{self, Lookup, Miss};
use crate::ui::output;
use anyhow::{bail, Context as _, Result};

/// Print the value at `path_text`, or report where the lookup stopped.
pub fn get(ctx: &Context, document: &Path, path_text: &str) -> Result<i32> {
    let path = path::parse(path_text).with_context(|| format!("Invalid path '{}'", path_text))?;
    if path.is_relative() {
        bail!(
            "'{}' is relative; get needs an absolute path such as sections.0.heading",
            path_text
        );
    }

    let document = inputs::document(&ctx.path(document))?;

    match path::get(document.raw(), &path) {
        Lookup::Found(value) => {
            let text = if ctx.json {
                serde_json::to_string_pretty(value)
            } else {
                match value.as_str() {
                    Some(s) => Ok(s.to_string()),
                    None => serde_json::to_string_pretty(value),
                }
            }
            .context("Failed to serialize value")?;
            println!("{}", text);
            Ok(0)
        }
        Lookup::NotFound { at_segment, miss } => {
            let reached = path.prefix(at_segment);
            let reason = match miss {
                Miss::MissingField => "has no such field",
                Miss::IndexOutOfRange => "is shorter than that index",
                Miss::TypeMismatch => "cannot be stepped into",
            };
            output::warn(
                format!(
                    "{} not found: {} {}",
                    path,
                    if reached.is_empty() {
                        "the document".to_string()
                    } else {
                        reached.to_string()
                    },
                    reason
                ),
                ctx.verbosity,
            );
            Ok(EXIT_VIOLATIONS)
        }
    }
}
