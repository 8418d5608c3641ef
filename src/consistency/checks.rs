//! consistency::checks
//!
//! The four cross-source checks over each declared content type.
//!
//! 1. Schema vs query projection (`projection-gap`)
//! 2. Schema vs editor model (`model-gap`)
//! 3. Render coverage and marker naming (`render-coverage`, `naming`)
//! 4. Fields inside lists of records (`nested-coverage`)
//!
//! A check that has nothing to compare against is skipped for that type: no
//! projection means no projection checks, no editor model means no model
//! checks, and a type that never rendered has no coverage to check.

use std::collections::{BTreeMap, BTreeSet};

use super::declarations::{ContentModel, ModelField, SchemaField, TypeDeclaration};
use super::query::Block;
use crate::core::naming;
use crate::engine::report::{Location, Violation, ViolationKind};
use crate::engine::validate::ObservedMarker;

/// Name a projection must select inside an asset field.
pub const ASSET_IDENTITY: &str = "_id";

/// Nesting limit for recursive item types.
const MAX_NESTING: usize = 8;

/// Run every check for every declared type.
///
/// `observed` holds the field markers seen per content type, section or list
/// item, as returned by [`crate::engine::validate::validate`].
pub fn check(
    model: &ContentModel,
    observed: &BTreeMap<String, Vec<ObservedMarker>>,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (type_name, decl) in model.types() {
        violations.extend(check_type(model, type_name, decl, observed.get(type_name)));
    }
    violations
}

/// Run every check for one type.
pub fn check_type(
    model: &ContentModel,
    type_name: &str,
    decl: &TypeDeclaration,
    observed: Option<&Vec<ObservedMarker>>,
) -> Vec<Violation> {
    let mut out = Vec::new();
    let fields = model.schema_fields(decl);

    if let Some(projection) = model.projection(type_name) {
        projection_gaps(type_name, &fields, projection, &mut out);
    }

    if let Some(editor) = &decl.editor_model {
        let covered = model.model_names(&editor.fields, &editor.includes);
        model_gaps(type_name, &fields, &covered, &mut out);
    }

    if let Some(markers) = observed {
        render_coverage(type_name, markers, &mut out);
    }

    let nested = Nested {
        model,
        type_name,
        out: &mut out,
    };
    nested.run(decl, &fields);

    out
}

fn projection_gaps(
    type_name: &str,
    fields: &[SchemaField],
    projection: &Block,
    out: &mut Vec<Violation>,
) {
    for field in fields {
        if !projection.covers(&field.name) {
            out.push(
                Violation::new(
                    ViolationKind::ProjectionGap,
                    Location::content_type(type_name),
                    format!("schema field '{}' is not selected by the query", field.name),
                )
                .expected(field.name.clone())
                .actual("not projected"),
            );
        } else if field.is_asset() && !has_identity(projection, &field.name) {
            let path = format!("{}.{}", field.name, ASSET_IDENTITY);
            out.push(
                Violation::new(
                    ViolationKind::ProjectionGap,
                    Location::content_type(type_name),
                    format!(
                        "asset field '{}' is projected without an identity, so it cannot carry an object marker",
                        field.name
                    ),
                )
                .expected(path)
                .actual("no identity projected"),
            );
        }
    }
}

fn has_identity(block: &Block, field: &str) -> bool {
    block
        .nested(field)
        .is_some_and(|inner| inner.names_explicitly(ASSET_IDENTITY))
}

fn model_gaps(
    type_name: &str,
    fields: &[SchemaField],
    covered: &BTreeSet<String>,
    out: &mut Vec<Violation>,
) {
    for field in fields {
        if !covered.contains(&field.name) {
            out.push(
                Violation::new(
                    ViolationKind::ModelGap,
                    Location::content_type(type_name),
                    format!(
                        "schema field '{}' is not covered by the editor model or its bundles",
                        field.name
                    ),
                )
                .expected(field.name.clone())
                .actual("missing"),
            );
        }
    }
}

fn render_coverage(type_name: &str, markers: &[ObservedMarker], out: &mut Vec<Violation>) {
    if !markers.iter().any(|m| !m.is_root) {
        out.push(
            Violation::new(
                ViolationKind::RenderCoverage,
                Location::content_type(type_name),
                format!("'{}' rendered without any field markers below its root", type_name),
            )
            .expected("at least one field marker")
            .actual(format!("{} root marker(s) only", markers.len())),
        );
    }

    let mut seen = BTreeSet::new();
    for marker in markers {
        for segment in naming::nonconforming_segments(&marker.path) {
            if seen.insert(segment.to_string()) {
                out.push(
                    Violation::new(
                        ViolationKind::Naming,
                        Location::content_type(type_name),
                        format!(
                            "rendered marker '{}' uses field name '{}', which is not camelCase",
                            marker.path, segment
                        ),
                    )
                    .expected("camelCase field name")
                    .actual(segment),
                );
            }
        }
    }
}

/// Where the editor model's nested declaration for a list comes from.
struct ModelScope {
    names: BTreeSet<String>,
    fields: Vec<ModelField>,
}

struct Nested<'a, 'o> {
    model: &'a ContentModel,
    type_name: &'a str,
    out: &'o mut Vec<Violation>,
}

impl Nested<'_, '_> {
    fn run(mut self, decl: &TypeDeclaration, fields: &[SchemaField]) {
        let projection = self.model.projection(self.type_name).cloned();
        let editor = decl.editor_model.as_ref().map(|m| m.fields.clone());
        self.fields(
            "",
            fields,
            projection.as_ref().map(Side::Block),
            editor.as_deref(),
            0,
        );
    }

    /// Check the list fields among `fields`.
    ///
    /// `projection` is the block these fields were selected in, and `editor`
    /// the editor-model entries at this level.
    fn fields(
        &mut self,
        prefix: &str,
        fields: &[SchemaField],
        projection: Option<Side<'_>>,
        editor: Option<&[ModelField]>,
        depth: usize,
    ) {
        if depth >= MAX_NESTING {
            return;
        }

        for field in fields.iter().filter(|f| f.is_array()) {
            let inner = self.model.item_fields(field);
            if inner.is_empty() {
                continue;
            }
            let path = if prefix.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{}", prefix, field.name)
            };

            let inner_projection = projection.and_then(|side| side.enter(&field.name));
            if let Some(side) = inner_projection {
                self.projected(&path, &inner, side);
            }

            let scope = editor.and_then(|entries| self.model_scope(field, entries));
            if let Some(scope) = &scope {
                self.modeled(&path, &inner, &scope.names);
            }

            self.fields(
                &path,
                &inner,
                inner_projection,
                scope.as_ref().map(|s| s.fields.as_slice()),
                depth + 1,
            );
        }
    }

    fn projected(&mut self, path: &str, inner: &[SchemaField], side: Side<'_>) {
        for field in inner {
            let covered = match side {
                Side::Block(block) => block.covers(&field.name),
                Side::Whole => true,
            };
            let identified = match side {
                Side::Block(block) => has_identity(block, &field.name),
                Side::Whole => false,
            };

            if !covered {
                self.push(
                    format!("{}.{}", path, field.name),
                    format!(
                        "list field '{}' items do not select '{}' in the query",
                        path, field.name
                    ),
                    "not projected",
                );
            } else if field.is_asset() && !identified {
                self.push(
                    format!("{}.{}", path, field.name),
                    format!(
                        "list field '{}' items project asset '{}' without an identity",
                        path, field.name
                    ),
                    "no identity projected",
                );
            }
        }
    }

    fn modeled(&mut self, path: &str, inner: &[SchemaField], names: &BTreeSet<String>) {
        for field in inner {
            if !names.contains(&field.name) {
                self.push(
                    format!("{}.{}", path, field.name),
                    format!(
                        "list field '{}' items do not declare '{}' in the editor model",
                        path, field.name
                    ),
                    "missing",
                );
            }
        }
    }

    /// The editor-model declaration covering the items of `field`: an inline
    /// nested entry first, then the item type's own editor model.
    fn model_scope(&self, field: &SchemaField, entries: &[ModelField]) -> Option<ModelScope> {
        let inline = entries.iter().find_map(|e| match e {
            ModelField::Nested {
                name,
                fields,
                includes,
            } if *name == field.name => Some((fields, includes)),
            _ => None,
        });

        if let Some((fields, includes)) = inline {
            return Some(ModelScope {
                names: self.model.model_names(fields, includes),
                fields: fields.clone(),
            });
        }

        let item = self.model.get(field.of.as_deref()?)?;
        let editor = item.editor_model.as_ref()?;
        Some(ModelScope {
            names: self.model.model_names(&editor.fields, &editor.includes),
            fields: editor.fields.clone(),
        })
    }

    fn push(&mut self, expected: String, message: String, actual: &str) {
        self.out.push(
            Violation::new(
                ViolationKind::NestedCoverage,
                Location::content_type(self.type_name),
                message,
            )
            .expected(expected)
            .actual(actual),
        );
    }
}

/// What the projection selects at some nesting level.
#[derive(Clone, Copy)]
enum Side<'b> {
    /// An explicit block of names.
    Block(&'b Block),
    /// The whole value: a bare name or a spread with no block.
    Whole,
}

impl<'b> Side<'b> {
    /// Step into `name`. `None` when the name is not selected at all.
    fn enter(self, name: &str) -> Option<Side<'b>> {
        match self {
            Side::Block(block) => match block.nested(name) {
                Some(inner) => Some(Side::Block(inner)),
                None if block.covers(name) => Some(Side::Whole),
                None => None,
            },
            Side::Whole => Some(Side::Whole),
        }
    }
}
