//! resolve command - Show what each field marker resolves to

use std::path::Path;

use super::inputs;
use crate::cli::Context;
use crate::engine::{self, ResolvedMarker};
use crate::render::MarkerAttributes;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Print each field marker with its absolute path.
///
/// Markers that could not be resolved at all are left out; `validate`
/// reports them.
pub fn resolve(ctx: &Context, document: &Path, render: &Path) -> Result<i32> {
    let markers = MarkerAttributes::from_config(&ctx.config);
    let document = inputs::document(&ctx.path(document))?;
    let tree = inputs::render_tree(&ctx.path(render), &markers)?;

    let result = engine::validate(&document, &tree);

    if ctx.json {
        let text = serde_json::to_string_pretty(&result.resolved)
            .context("Failed to serialize resolved markers")?;
        println!("{}", text);
        return Ok(0);
    }

    if result.resolved.is_empty() {
        output::print("No field markers resolved.", ctx.verbosity);
        return Ok(0);
    }

    for marker in &result.resolved {
        println!("{}", format_marker(marker));
    }
    Ok(0)
}

fn format_marker(marker: &ResolvedMarker) -> String {
    let mut line = format!(
        "{}  {} -> {}",
        marker.location, marker.marker, marker.absolute
    );
    if !marker.found {
        line.push_str("  (not found)");
    }
    if marker.ambiguous {
        line.push_str("  (ambiguous)");
    }
    line
}
