//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Annotrace - checks visual-editing annotations against content
#[derive(Parser, Debug)]
#[command(name = "annotrace")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if annotrace was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Document/render-tree pairs given on the command line.
///
/// The n-th `--document` pairs with the n-th `--render`.
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Content document (JSON page object)
    #[arg(long = "document", value_name = "FILE")]
    pub documents: Vec<PathBuf>,

    /// Render tree (JSON element tree)
    #[arg(long = "render", value_name = "FILE")]
    pub renders: Vec<PathBuf>,
}

impl PageArgs {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.renders.is_empty()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate rendered annotations against content documents
    #[command(
        name = "validate",
        long_about = "Validate rendered annotations against content documents.\n\n\
            Every field marker in the render tree is resolved to an absolute path \
            through its ancestor markers and looked up in the page's content document. \
            Section roots must be present, unique and in document order; list indices \
            must be in range; field names must be camelCase.\n\n\
            Without --document/--render, the [[pages]] of the project config are used.",
        after_help = "\
EXAMPLES:
    # Validate one page
    annotrace validate --document home.json --render home.render.json

    # Validate every page listed in annotrace.toml
    annotrace validate

    # Machine-readable report
    annotrace validate --json

EXIT STATUS:
    0  no violations
    1  violations found
    2  an input could not be read or parsed"
    )]
    Validate {
        #[command(flatten)]
        pages: PageArgs,
    },

    /// Check the content model declarations for gaps
    #[command(
        name = "check",
        long_about = "Check the content model declarations for gaps.\n\n\
            For each declared content type, compares the schema fields with the \
            query projection and the editor model, and checks fields inside lists \
            of records. When pages are given (or configured), also checks that every \
            rendered section type carries field markers and that their names are \
            camelCase.",
        after_help = "\
EXAMPLES:
    # Check declarations named in annotrace.toml against its pages
    annotrace check

    # Check a declarations file alone
    annotrace check --declarations content-model.toml"
    )]
    Check {
        /// Declarations file (TOML or JSON)
        #[arg(long, value_name = "FILE")]
        declarations: Option<PathBuf>,

        #[command(flatten)]
        pages: PageArgs,
    },

    /// Print the absolute path each marker resolves to
    #[command(name = "resolve")]
    Resolve {
        /// Content document (JSON page object)
        #[arg(long, value_name = "FILE")]
        document: PathBuf,

        /// Render tree (JSON element tree)
        #[arg(long, value_name = "FILE")]
        render: PathBuf,
    },

    /// Look up an absolute field path in a content document
    #[command(
        name = "get",
        after_help = "\
EXAMPLES:
    annotrace get --document home.json sections.0.items.1.name"
    )]
    Get {
        /// Content document (JSON page object)
        #[arg(long, value_name = "FILE")]
        document: PathBuf,

        /// Absolute field path, e.g. sections.0.heading
        path: String,
    },

    /// Generate shell completion scripts
    #[command(name = "completion")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn page_flags_pair_in_order() {
        let cli = Cli::try_parse_from([
            "annotrace",
            "validate",
            "--document",
            "a.json",
            "--render",
            "a.render.json",
            "--document",
            "b.json",
            "--render",
            "b.render.json",
        ])
        .unwrap();
        match cli.command {
            Command::Validate { pages } => {
                assert_eq!(pages.documents.len(), 2);
                assert_eq!(pages.renders[1], PathBuf::from("b.render.json"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["annotrace", "check", "--json", "-q"]).unwrap();
        assert!(cli.json);
        assert!(cli.quiet);
    }
}
