//! End-to-end scenarios over the library API.
//!
//! A: list items resolve through their container, a surplus item is out of
//!    bounds. B: an editor model missing a schema field. C: a list of records
//!    whose projected image has no identity. D: a non-camelCase marker.

use std::collections::BTreeMap;

use annotrace::consistency::{check, ContentModel, Format};
use annotrace::core::document::ContentDocument;
use annotrace::engine::{validate, Location, Report, ViolationKind};
use annotrace::render::{NodeId, RenderTree};

const CATEGORIES: &str = r#"{
    "_id": "home",
    "sections": [{
        "_type": "categoriesSection",
        "heading": "Shop by Category",
        "items": [{ "name": "Electronics" }, { "name": "Fashion" }]
    }]
}"#;

fn categories() -> ContentDocument {
    ContentDocument::from_json_str(CATEGORIES, "home.json").unwrap()
}

/// `section(sections.0) > h2(.heading), ul(.items) > li(.i) > span(<leaf>)`
fn categories_tree(leaves: &[&str]) -> (RenderTree, Vec<NodeId>) {
    let mut tree = RenderTree::new("main");
    let section = tree.add_marked(tree.root(), "section", Some("sections.0"), None);
    tree.add_marked(section, "h2", Some(".heading"), None);
    let list = tree.add_marked(section, "ul", Some(".items"), None);

    let mut spans = Vec::new();
    for (i, leaf) in leaves.iter().enumerate() {
        let index = format!(".{}", i);
        let li = tree.add_marked(list, "li", Some(&index), None);
        spans.push(tree.add_marked(li, "span", Some(leaf), None));
    }
    (tree, spans)
}

#[test]
fn scenario_a_items_resolve_through_container() {
    let (tree, _) = categories_tree(&[".name", ".name"]);
    let result = validate(&categories(), &tree);

    assert!(result.passed(), "{:?}", result.violations);
    let resolved: Vec<(String, String)> = result
        .resolved
        .iter()
        .map(|r| (r.marker.clone(), r.absolute.to_string()))
        .collect();
    assert_eq!(
        resolved,
        vec![
            (".heading".to_string(), "sections.0.heading".to_string()),
            (".items".to_string(), "sections.0.items".to_string()),
            (".0".to_string(), "sections.0.items.0".to_string()),
            (".name".to_string(), "sections.0.items.0.name".to_string()),
            (".1".to_string(), "sections.0.items.1".to_string()),
            (".name".to_string(), "sections.0.items.1.name".to_string()),
        ]
    );
}

#[test]
fn scenario_a_surplus_item_is_out_of_bounds() {
    let (tree, _) = categories_tree(&[".name", ".name", ".name"]);
    let result = validate(&categories(), &tree);

    assert_eq!(result.violations.len(), 1);
    let v = &result.violations[0];
    assert_eq!(v.kind, ViolationKind::OutOfBounds);
    assert_eq!(v.expected.as_deref(), Some("index < 2"));
    assert_eq!(v.actual.as_deref(), Some("2"));
    assert_eq!(
        v.location,
        Location::node("main/section[0]/ul[1]/li[2]", Some("sections.0".to_string()))
    );
}

#[test]
fn scenario_b_model_gap() {
    let model = ContentModel::parse(
        r#"{ "types": { "productCard": {
            "schema": { "fields": [
                { "name": "ctaLabel", "type": "string" },
                { "name": "productSlug", "type": "string" },
                { "name": "variantSku", "type": "string" }
            ] },
            "editorModel": { "fields": ["productSlug", "variantSku"] }
        } } }"#,
        Format::Json,
        "model.json",
    )
    .unwrap();

    let violations = check(&model, &BTreeMap::new());
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::ModelGap);
    assert_eq!(violations[0].expected.as_deref(), Some("ctaLabel"));
    assert_eq!(violations[0].location, Location::content_type("productCard"));
}

#[test]
fn scenario_c_nested_identity_missing() {
    let model = ContentModel::parse(
        r#"
sectionsQuery = '''{
  _type, _key,
  _type == "flashSaleSection" => {
    heading,
    items[] { _key, name, image { "src": image.asset->url, "alt": alt } }
  }
}'''

[types.flashSaleSection]
section = true

[types.flashSaleSection.schema]
fields = [
  { name = "heading", type = "string" },
  { name = "items", type = "array", of = "flashProduct" },
]

[types.flashProduct.schema]
fields = [
  { name = "image", type = "customImage" },
  { name = "name", type = "string" },
]
"#,
        Format::Toml,
        "model.toml",
    )
    .unwrap();

    let violations = check(&model, &BTreeMap::new());
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::NestedCoverage);
    assert_eq!(violations[0].expected.as_deref(), Some("items.image"));
    assert_eq!(violations[0].location, Location::content_type("flashSaleSection"));
}

#[test]
fn scenario_d_naming() {
    let (tree, spans) = categories_tree(&[".Item_Name", ".name"]);
    let result = validate(&categories(), &tree);

    let naming: Vec<_> = result
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::Naming)
        .collect();
    assert_eq!(naming.len(), 1);
    assert_eq!(naming[0].actual.as_deref(), Some("Item_Name"));
    assert_eq!(
        naming[0].location,
        Location::node(tree.location(spans[0]), Some("sections.0".to_string()))
    );
}

#[test]
fn text_report() {
    let (tree, _) = categories_tree(&[".Item_Name", ".name", ".name"]);
    let result = validate(&categories(), &tree);
    let report = Report::new(result.violations);

    insta::assert_snapshot!(report.format(), @r###"
    FAIL: 3 violation(s) (1 path-resolution, 1 out-of-bounds, 1 naming)

    [naming] main/section[0]/ul[1]/li[0]/span[0] (root sections.0)
      field name 'Item_Name' in marker '.Item_Name' is not camelCase
      expected: camelCase field name
      actual:   Item_Name

    [path-resolution] main/section[0]/ul[1]/li[0]/span[0] (root sections.0)
      marker '.Item_Name' resolves to sections.0.items.0.Item_Name which is not in the document
      expected: sections.0.items.0.Item_Name
      actual:   missing field at 'Item_Name' (sections.0.items.0.Item_Name)

    [out-of-bounds] main/section[0]/ul[1]/li[2] (root sections.0)
      index 2 is out of range for sections.0.items (length 2)
      expected: index < 2
      actual:   2
    "###);
}

#[test]
fn item_type_markers_are_checked() {
    let doc = ContentDocument::from_json_str(
        r#"{ "sections": [{
            "_type": "featuredProductsSection",
            "items": [{ "_type": "productCard", "name": "Smart Watch" }]
        }] }"#,
        "featured.json",
    )
    .unwrap();
    let mut tree = RenderTree::new("main");
    let section = tree.add_marked(tree.root(), "section", Some("sections.0"), None);
    let list = tree.add_marked(section, "ul", Some(".items"), None);
    let li = tree.add_marked(list, "li", Some(".0"), None);
    tree.add_marked(li, "span", Some(".Bad_Name"), None);

    let model = ContentModel::parse(
        r#"{ "types": { "productCard": { "schema": { "fields": [] } } } }"#,
        Format::Json,
        "model.json",
    )
    .unwrap();

    let result = validate(&doc, &tree);
    let violations = check(&model, &result.observed);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::Naming);
    assert_eq!(violations[0].actual.as_deref(), Some("Bad_Name"));
    assert_eq!(violations[0].location, Location::content_type("productCard"));
}
