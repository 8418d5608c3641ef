//! Loading of command inputs.
//!
//! Every input is read here, before any check runs, so a missing or broken
//! file stops the command with a fatal error instead of a partial report.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use crate::cli::args::PageArgs;
use crate::cli::Context;
use crate::consistency::ContentModel;
use crate::core::document::ContentDocument;
use crate::render::{self, MarkerAttributes, RenderTree};

/// A loaded document and its render tree.
#[derive(Debug)]
pub struct Page {
    /// Label attached to violations from this page.
    pub label: String,
    pub document: ContentDocument,
    pub tree: RenderTree,
}

/// A page to load, before reading it.
struct PageSource {
    name: Option<String>,
    document: PathBuf,
    render: PathBuf,
}

/// Load the pages named on the command line, or the configured ones.
pub fn pages(ctx: &Context, args: &PageArgs) -> Result<Vec<Page>> {
    let sources = if args.is_empty() {
        ctx.config
            .pages()
            .into_iter()
            .map(|page| PageSource {
                name: page.name,
                document: page.document,
                render: page.render,
            })
            .collect()
    } else {
        from_args(ctx, args)?
    };

    let markers = MarkerAttributes::from_config(&ctx.config);
    ctx.debug(format!(
        "marker attributes: field={} object={}",
        markers.field, markers.object
    ));

    sources
        .into_iter()
        .map(|source| {
            let document = document(&source.document)?;
            let tree = render_tree(&source.render, &markers)?;
            let label = source
                .name
                .or_else(|| document.label().map(str::to_string))
                .unwrap_or_else(|| file_stem(&source.document));
            ctx.debug(format!(
                "page {}: {} sections, {} render nodes",
                label,
                document.section_count(),
                tree.len()
            ));
            Ok(Page {
                label,
                document,
                tree,
            })
        })
        .collect()
}

fn from_args(ctx: &Context, args: &PageArgs) -> Result<Vec<PageSource>> {
    if args.documents.len() != args.renders.len() {
        bail!(
            "every --document needs a matching --render (got {} documents and {} render trees)",
            args.documents.len(),
            args.renders.len()
        );
    }
    Ok(args
        .documents
        .iter()
        .zip(&args.renders)
        .map(|(document, render)| PageSource {
            name: None,
            document: ctx.path(document),
            render: ctx.path(render),
        })
        .collect())
}

/// Read a content document.
pub fn document(path: &Path) -> Result<ContentDocument> {
    ContentDocument::load(path)
        .with_context(|| format!("Failed to load content document {}", path.display()))
}

/// Read a render tree.
pub fn render_tree(path: &Path, markers: &MarkerAttributes) -> Result<RenderTree> {
    render::load::load(path, markers)
        .with_context(|| format!("Failed to load render tree {}", path.display()))
}

/// Read the declarations named on the command line, or the configured ones.
pub fn declarations(ctx: &Context, flag: Option<&Path>) -> Result<ContentModel> {
    let path = match flag {
        Some(path) => ctx.path(path),
        None => match ctx.config.declarations() {
            Some(path) => path,
            None => bail!("No declarations file. Pass --declarations or set 'declarations' in annotrace.toml"),
        },
    };
    ctx.debug(format!("declarations: {}", path.display()));
    ContentModel::load(&path)
        .with_context(|| format!("Failed to load declarations {}", path.display()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
