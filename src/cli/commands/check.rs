//! check command - Cross-check the content model declarations

use std::collections::BTreeMap;
use std::path::Path;

use super::{finish, inputs};
use crate::cli::args::PageArgs;
use crate::cli::Context;
use crate::consistency;
use crate::engine::{self, ObservedMarker, Report};
use crate::ui::output;
use anyhow::Result;

/// Run the consistency checks.
///
/// Pages only contribute the markers observed per section type; their own
/// render violations belong to `validate`.
pub fn check(ctx: &Context, declarations: Option<&Path>, args: &PageArgs) -> Result<i32> {
    let model = inputs::declarations(ctx, declarations)?;
    let pages = inputs::pages(ctx, args)?;

    let mut observed: BTreeMap<String, Vec<ObservedMarker>> = BTreeMap::new();
    for page in &pages {
        let result = engine::validate(&page.document, &page.tree);
        for (type_name, markers) in result.observed {
            observed.entry(type_name).or_default().extend(markers);
        }
    }

    if pages.is_empty() {
        ctx.debug("no pages given; render coverage is not checked");
    } else {
        let types: Vec<String> = observed
            .iter()
            .map(|(name, markers)| format!("{} ({} markers)", name, markers.len()))
            .collect();
        ctx.debug(format!(
            "observed section types:\n{}",
            output::format_list(&types, "  ")
        ));
    }

    let report = Report::new(consistency::check(&model, &observed));
    finish(ctx, &report)
}
