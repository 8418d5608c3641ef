//! cli
//!
//! Command-line interface layer for annotrace.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and input files
//! - Delegate to the checks and print the report
//!
//! # Architecture
//!
//! The CLI layer is thin. All file reading happens here, up front; the
//! [`crate::engine`] and [`crate::consistency`] checks only see loaded values.
//!
//! Commands return the process exit code: 0 when clean, 1 when violations were
//! found. Fatal errors propagate as `Err` and exit with 2.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::ui::output::{self, Verbosity};

/// Exit code for a run that found violations.
pub const EXIT_VIOLATIONS: i32 = 1;

/// Exit code for a fatal error.
pub const EXIT_FATAL: i32 = 2;

/// Settings shared by every command.
#[derive(Debug)]
pub struct Context {
    /// Directory relative input paths are resolved against
    pub cwd: PathBuf,
    pub verbosity: Verbosity,
    /// Print results as JSON
    pub json: bool,
    pub config: Config,
}

impl Context {
    /// Resolve a command-line path against the working directory.
    pub fn path(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.cwd.join(path)
        } else {
            path.to_path_buf()
        }
    }

    pub fn debug(&self, message: impl std::fmt::Display) {
        output::debug(message, self.verbosity);
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<i32> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);

    let cwd = match cli.cwd.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let loaded = Config::load(Some(&cwd)).context("Failed to load config")?;
    for warning in &loaded.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }
    let config = loaded.config;

    if let Some(path) = config.global_config_loaded_from() {
        output::debug(format!("global config: {}", path.display()), verbosity);
    }
    if let Some(path) = config.project_config_loaded_from() {
        output::debug(format!("project config: {}", path.display()), verbosity);
    }

    // CLI flag always takes precedence over the configured format.
    let json = cli.json || config.json_output();

    let ctx = Context {
        cwd,
        verbosity,
        json,
        config,
    };

    commands::dispatch(cli.command, &ctx)
}
