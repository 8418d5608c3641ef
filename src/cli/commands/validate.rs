//! validate command - Check rendered markers against content documents

use super::{finish, inputs};
use crate::cli::args::PageArgs;
use crate::cli::Context;
use crate::engine::{self, Report};
use anyhow::{bail, Result};

/// Validate every given or configured page and print one report.
pub fn validate(ctx: &Context, args: &PageArgs) -> Result<i32> {
    let pages = inputs::pages(ctx, args)?;
    if pages.is_empty() {
        bail!("No pages to validate. Pass --document and --render, or add [[pages]] to annotrace.toml");
    }

    let mut report = Report::new(Vec::new());
    for page in &pages {
        let result = engine::validate(&page.document, &page.tree);

        for marker in result.ambiguous() {
            ctx.debug(format!(
                "{}: '{}' at {} resolved to {} by the nearest list container",
                page.label, marker.marker, marker.location, marker.absolute
            ));
        }
        ctx.debug(format!(
            "{}: {} markers resolved, {} violations",
            page.label,
            result.resolved.len(),
            result.violations.len()
        ));

        report.extend(
            result
                .violations
                .into_iter()
                .map(|v| v.on_page(&page.label)),
        );
    }

    finish(ctx, &report)
}
