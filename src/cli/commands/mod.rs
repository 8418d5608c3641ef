//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads its inputs through [`inputs`]
//! 2. Runs the library checks on the loaded values
//! 3. Formats and displays output, and returns the exit code

mod check;
mod completion;
mod get;
mod inputs;
mod resolve;
mod validate;

// Re-export command functions for testing and direct invocation
pub use check::check;
pub use completion::completion;
pub use get::get;
pub use resolve::resolve;
pub use validate::validate;

use crate::cli::args::Command;
use crate::cli::{Context, EXIT_VIOLATIONS};
use crate::engine::Report;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<i32> {
    match command {
        Command::Validate { pages } => validate(ctx, &pages),
        Command::Check {
            declarations,
            pages,
        } => check(ctx, declarations.as_deref(), &pages),
        Command::Resolve { document, render } => resolve(ctx, &document, &render),
        Command::Get { document, path } => get(ctx, &document, &path),
        Command::Completion { shell } => {
            completion(shell)?;
            Ok(0)
        }
    }
}

/// Print a report and turn it into an exit code.
fn finish(ctx: &Context, report: &Report) -> Result<i32> {
    if ctx.json {
        let text = serde_json::to_string_pretty(&report.to_json())
            .context("Failed to serialize report")?;
        println!("{}", text);
    } else if report.passed() {
        output::success(report.format(), ctx.verbosity);
    } else {
        println!("{}", report.format());
    }

    Ok(if report.passed() { 0 } else { EXIT_VIOLATIONS })
}
