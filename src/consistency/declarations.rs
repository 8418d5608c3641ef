//! consistency::declarations
//!
//! The declarations file: schema, query and editor-model descriptions of each
//! content type, plus the shared bundles and query fragments they reference.
//!
//! # Format
//!
//! JSON or TOML (chosen by file extension). In TOML:
//!
//! ```toml
//! sectionsQuery = "{ ${BASE}, _type == \"supportSection\" => { heading } }"
//!
//! [bundles]
//! sectionBase = ["theme", "width", { name = "backgroundImage", type = "image" }]
//!
//! [fragments]
//! BASE = "_type, _key, theme, width, backgroundImage"
//!
//! [types.supportSection]
//! section = true
//!
//! [types.supportSection.schema]
//! includes = ["sectionBase"]
//! fields = [{ name = "heading", type = "string" }]
//!
//! [types.supportSection.editorModel]
//! includes = ["sectionBase"]
//! fields = ["heading"]
//! ```
//!
//! # Validation
//!
//! Loading fails when a bundle, fragment or item type is referenced but not
//! declared, or when a query does not scan.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::query::{expand_fragments, parse_projection, Block, QueryError};

/// Field kinds that carry an asset and need a projected identity.
pub const ASSET_KINDS: &[&str] = &["image", "customImage", "file"];

/// Field kinds that never name a declared type.
pub const PRIMITIVE_KINDS: &[&str] = &[
    "string",
    "text",
    "number",
    "boolean",
    "url",
    "date",
    "datetime",
    "slug",
    "reference",
    "block",
    "object",
    "array",
    "image",
    "customImage",
    "file",
];

/// Errors from loading declarations.
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("failed to read declarations '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse declarations '{origin}': {message}")]
    Parse { origin: String, message: String },

    #[error("{owner}: unknown bundle '{bundle}'")]
    UnknownBundle { owner: String, bundle: String },

    #[error("{owner}: field '{field}' lists items of unknown type '{item}'")]
    UnknownItemType {
        owner: String,
        field: String,
        item: String,
    },

    #[error("{owner}: invalid query: {source}")]
    Query { owner: String, source: QueryError },
}

/// Serialization format of a declarations file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// Pick the format from a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// The raw declarations document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Declarations {
    /// Shared base-field bundles.
    #[serde(default)]
    pub bundles: BTreeMap<String, Vec<BundleField>>,

    /// Query fragments substituted for `${NAME}`.
    #[serde(default)]
    pub fragments: BTreeMap<String, String>,

    /// Combined projection for all section types.
    #[serde(default)]
    pub sections_query: Option<String>,

    #[serde(default)]
    pub types: BTreeMap<String, TypeDeclaration>,
}

/// Everything declared about one content type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeDeclaration {
    pub schema: SchemaDeclaration,

    /// Projection text for this type alone.
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub editor_model: Option<EditorModelDeclaration>,

    /// Whether this type is a page section projected by `sectionsQuery`.
    #[serde(default)]
    pub section: bool,
}

/// The authoritative field list of a type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchemaDeclaration {
    #[serde(default)]
    pub fields: Vec<SchemaField>,
    #[serde(default)]
    pub includes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Item type of an array field.
    #[serde(default)]
    pub of: Option<String>,
    /// Inline item fields of an array field.
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

impl SchemaField {
    fn bundled(entry: &BundleField) -> Self {
        Self {
            name: entry.name().to_string(),
            kind: entry.kind().to_string(),
            of: None,
            fields: Vec::new(),
        }
    }

    pub fn is_asset(&self) -> bool {
        ASSET_KINDS.contains(&self.kind.as_str())
    }

    pub fn is_array(&self) -> bool {
        self.kind == "array"
    }
}

/// A bundle entry: a bare name, or a name with its field kind.
///
/// Bare names are taken to be plain strings, so an asset field shared through
/// a bundle must give its kind to be held to the identity rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BundleField {
    Name(String),
    Typed {
        name: String,
        #[serde(rename = "type")]
        kind: String,
    },
}

impl BundleField {
    pub fn name(&self) -> &str {
        match self {
            BundleField::Name(name) => name,
            BundleField::Typed { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            BundleField::Name(_) => "string",
            BundleField::Typed { kind, .. } => kind,
        }
    }
}

/// The editor's field list for a type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EditorModelDeclaration {
    #[serde(default)]
    pub fields: Vec<ModelField>,
    #[serde(default)]
    pub includes: Vec<String>,
}

/// An editor-model entry: a bare name, or a name with nested declarations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModelField {
    Name(String),
    Nested {
        name: String,
        #[serde(default)]
        fields: Vec<ModelField>,
        #[serde(default)]
        includes: Vec<String>,
    },
}

impl ModelField {
    pub fn name(&self) -> &str {
        match self {
            ModelField::Name(name) => name,
            ModelField::Nested { name, .. } => name,
        }
    }
}

/// Declarations after validation, with projections scanned.
#[derive(Debug, Clone)]
pub struct ContentModel {
    declarations: Declarations,
    projections: BTreeMap<String, Block>,
}

impl ContentModel {
    /// Read, parse and validate a declarations file.
    pub fn load(path: &Path) -> Result<Self, DeclarationError> {
        let text = fs::read_to_string(path).map_err(|source| DeclarationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, Format::from_path(path), &path.display().to_string())
    }

    /// Parse and validate declarations text.
    pub fn parse(text: &str, format: Format, origin: &str) -> Result<Self, DeclarationError> {
        let declarations: Declarations = match format {
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
        .map_err(|message| DeclarationError::Parse {
            origin: origin.to_string(),
            message,
        })?;

        Self::new(declarations)
    }

    /// Validate declarations and scan their projections.
    pub fn new(declarations: Declarations) -> Result<Self, DeclarationError> {
        let known: BTreeSet<&str> = declarations.types.keys().map(String::as_str).collect();

        for (type_name, decl) in &declarations.types {
            check_bundles(&declarations, type_name, &decl.schema.includes)?;
            check_items(&known, type_name, &decl.schema.fields)?;
            if let Some(model) = &decl.editor_model {
                check_bundles(&declarations, type_name, &model.includes)?;
                check_model_bundles(&declarations, type_name, &model.fields)?;
            }
        }

        let sections = match &declarations.sections_query {
            Some(text) => Some(scan(&declarations, "sectionsQuery", text)?),
            None => None,
        };

        let mut projections = BTreeMap::new();
        for (type_name, decl) in &declarations.types {
            let block = match (&decl.query, &sections) {
                (Some(text), _) => Some(scan(&declarations, type_name, text)?),
                (None, Some(all)) if decl.section => Some(all.for_type(type_name)),
                _ => None,
            };
            if let Some(block) = block {
                projections.insert(type_name.clone(), block);
            }
        }

        Ok(Self {
            declarations,
            projections,
        })
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    /// Declared types, by name.
    pub fn types(&self) -> impl Iterator<Item = (&str, &TypeDeclaration)> {
        self.declarations
            .types
            .iter()
            .map(|(name, decl)| (name.as_str(), decl))
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDeclaration> {
        self.declarations.types.get(type_name)
    }

    /// The scanned projection of a type, if one is declared.
    pub fn projection(&self, type_name: &str) -> Option<&Block> {
        self.projections.get(type_name)
    }

    /// Schema fields of a type with bundle fields appended.
    pub fn schema_fields(&self, decl: &TypeDeclaration) -> Vec<SchemaField> {
        let mut fields = decl.schema.fields.clone();
        for entry in self.bundle_entries(&decl.schema.includes) {
            if !fields.iter().any(|f| f.name == entry.name()) {
                fields.push(SchemaField::bundled(entry));
            }
        }
        fields
    }

    /// Item fields of an array field: inline fields, else the item type's
    /// schema. Empty for arrays of primitives.
    pub fn item_fields(&self, field: &SchemaField) -> Vec<SchemaField> {
        if !field.fields.is_empty() {
            return field.fields.clone();
        }
        field
            .of
            .as_deref()
            .and_then(|item| self.get(item))
            .map(|decl| self.schema_fields(decl))
            .unwrap_or_default()
    }

    /// Names covered by an editor-model field list and its bundles.
    pub fn model_names(&self, fields: &[ModelField], includes: &[String]) -> BTreeSet<String> {
        fields
            .iter()
            .map(|f| f.name().to_string())
            .chain(
                self.bundle_entries(includes)
                    .map(|entry| entry.name().to_string()),
            )
            .collect()
    }

    fn bundle_entries<'a>(
        &'a self,
        includes: &'a [String],
    ) -> impl Iterator<Item = &'a BundleField> {
        includes
            .iter()
            .filter_map(|b| self.declarations.bundles.get(b))
            .flatten()
    }
}

fn scan(declarations: &Declarations, owner: &str, text: &str) -> Result<Block, DeclarationError> {
    let to_error = |source| DeclarationError::Query {
        owner: owner.to_string(),
        source,
    };
    let expanded = expand_fragments(text, &declarations.fragments).map_err(to_error)?;
    parse_projection(&expanded).map_err(to_error)
}

fn check_bundles(
    declarations: &Declarations,
    owner: &str,
    includes: &[String],
) -> Result<(), DeclarationError> {
    match includes
        .iter()
        .find(|b| !declarations.bundles.contains_key(*b))
    {
        Some(bundle) => Err(DeclarationError::UnknownBundle {
            owner: owner.to_string(),
            bundle: bundle.clone(),
        }),
        None => Ok(()),
    }
}

fn check_model_bundles(
    declarations: &Declarations,
    owner: &str,
    fields: &[ModelField],
) -> Result<(), DeclarationError> {
    for field in fields {
        if let ModelField::Nested {
            fields, includes, ..
        } = field
        {
            check_bundles(declarations, owner, includes)?;
            check_model_bundles(declarations, owner, fields)?;
        }
    }
    Ok(())
}

fn check_items(
    known: &BTreeSet<&str>,
    owner: &str,
    fields: &[SchemaField],
) -> Result<(), DeclarationError> {
    for field in fields {
        if let Some(item) = &field.of {
            if !known.contains(item.as_str()) && !PRIMITIVE_KINDS.contains(&item.as_str()) {
                return Err(DeclarationError::UnknownItemType {
                    owner: owner.to_string(),
                    field: field.name.clone(),
                    item: item.clone(),
                });
            }
        }
        check_items(known, owner, &field.fields)?;
    }
    Ok(())
}
