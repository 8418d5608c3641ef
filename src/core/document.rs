//! core::document
//!
//! The content document: a page and its ordered sections.
//!
//! # Model
//!
//! Sections are a closed sum type keyed by the `_type` discriminator. A
//! document whose sections cannot be read into one of the known variants is
//! rejected as a whole, since nothing downstream can be trusted against it.
//!
//! Inside a section the typed model is lenient. Query output carries `null`
//! for absent lists and sometimes a number where text is expected; such a
//! field reads as empty or is coerced rather than failing the document. The
//! validator checks markers against the raw value, so nothing is lost.
//!
//! The loaded document also keeps the raw JSON value. Path lookups always walk
//! the raw value so every member present in the artifact is reachable, even
//! ones the typed model does not name.
//!
//! # Example
//!
//! ```
//! use annotrace::core::document::ContentDocument;
//!
//! let doc = ContentDocument::from_json_str(
//!     r#"{ "sections": [{ "_type": "categoriesSection", "heading": "Shop", "items": [] }] }"#,
//!     "inline",
//! )
//! .unwrap();
//!
//! assert_eq!(doc.section_count(), 1);
//! assert_eq!(doc.section_type(0), Some("categoriesSection"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Maximum characters shown when previewing offending input.
const PREVIEW_LEN: usize = 80;

/// Errors from loading a content document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read content document '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse content document '{origin}' at line {line}, column {column}: {message}\n  near: {preview}")]
    Parse {
        origin: String,
        line: usize,
        column: usize,
        message: String,
        preview: String,
    },

    #[error("content document '{origin}' has an unreadable page at {path}: {message}\n  near: {preview}")]
    Shape {
        origin: String,
        /// Where in the document reading stopped, e.g. `sections[2]`.
        path: String,
        message: String,
        preview: String,
    },
}

/// A loaded content document.
#[derive(Debug, Clone)]
pub struct ContentDocument {
    page: Page,
    raw: Value,
}

impl ContentDocument {
    /// Read and parse a content document from disk.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, &path.display().to_string())
    }

    /// Parse a content document from JSON text.
    ///
    /// `origin` names the input in error messages.
    pub fn from_json_str(text: &str, origin: &str) -> Result<Self, DocumentError> {
        let raw: Value = serde_json::from_str(text).map_err(|e| parse_error(text, origin, e))?;
        Self::from_raw(raw, origin)
    }

    /// Build a document from an already-parsed value.
    pub fn from_value(raw: Value) -> Result<Self, DocumentError> {
        Self::from_raw(raw, "<value>")
    }

    fn from_raw(raw: Value, origin: &str) -> Result<Self, DocumentError> {
        let page = Page::deserialize(&raw).map_err(|e| shape_error(&raw, origin, e))?;
        Ok(Self { page, raw })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// The raw JSON value every path lookup walks.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn sections(&self) -> &[Section] {
        &self.page.sections
    }

    pub fn section_count(&self) -> usize {
        self.page.sections.len()
    }

    /// The `_type` of section `index`.
    pub fn section_type(&self, index: usize) -> Option<&'static str> {
        self.page.sections.get(index).map(Section::type_name)
    }

    /// A short label for reports: the page id, then slug, then title.
    pub fn label(&self) -> Option<&str> {
        self.page
            .id
            .as_deref()
            .or_else(|| self.page.slug.as_ref().map(|s| s.current.as_str()))
            .or(self.page.title.as_deref())
    }
}

fn parse_error(text: &str, origin: &str, err: serde_json::Error) -> DocumentError {
    DocumentError::Parse {
        origin: origin.to_string(),
        line: err.line(),
        column: err.column(),
        message: err.to_string(),
        preview: preview(text, err.line()),
    }
}

// Errors from reading a Value carry no position. Only the page shell and the
// section variants are strict, so the first section that fails to read on its
// own is where the error is.
fn shape_error(raw: &Value, origin: &str, err: serde_json::Error) -> DocumentError {
    let (path, at) = match raw.get("sections") {
        Some(Value::Array(sections)) => sections
            .iter()
            .enumerate()
            .find(|(_, section)| Section::deserialize(*section).is_err())
            .map(|(i, section)| (format!("sections[{}]", i), section))
            .unwrap_or_else(|| ("sections".to_string(), raw)),
        Some(other) => ("sections".to_string(), other),
        None => ("<root>".to_string(), raw),
    };
    DocumentError::Shape {
        origin: origin.to_string(),
        path,
        message: err.to_string(),
        preview: preview(&at.to_string(), 1),
    }
}

/// The given 1-based line of `text`, trimmed and truncated.
fn preview(text: &str, line: usize) -> String {
    let source = text
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or(text)
        .trim();
    let mut out: String = source.chars().take(PREVIEW_LEN).collect();
    if source.chars().count() > PREVIEW_LEN {
        out.push_str("...");
    }
    out
}

/// A rendered page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::record")]
    pub slug: Option<Slug>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub meta_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub meta_description: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slug {
    pub current: String,
}

/// One page section, discriminated by `_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "_type", rename_all = "camelCase")]
pub enum Section {
    HeroCarouselSection(HeroCarouselSection),
    StoriesSection(StoriesSection),
    CategoriesSection(CategoriesSection),
    FlashSaleSection(FlashSaleSection),
    FeaturedProductsSection(FeaturedProductsSection),
    SupportSection(SupportSection),
}

impl Section {
    /// The `_type` discriminator of this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Section::HeroCarouselSection(_) => "heroCarouselSection",
            Section::StoriesSection(_) => "storiesSection",
            Section::CategoriesSection(_) => "categoriesSection",
            Section::FlashSaleSection(_) => "flashSaleSection",
            Section::FeaturedProductsSection(_) => "featuredProductsSection",
            Section::SupportSection(_) => "supportSection",
        }
    }

    /// Fields shared by every section kind.
    pub fn base(&self) -> &SectionBase {
        match self {
            Section::HeroCarouselSection(s) => &s.base,
            Section::StoriesSection(s) => &s.base,
            Section::CategoriesSection(s) => &s.base,
            Section::FlashSaleSection(s) => &s.base,
            Section::FeaturedProductsSection(s) => &s.base,
            Section::SupportSection(s) => &s.base,
        }
    }
}

/// Section base fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionBase {
    #[serde(rename = "_key", default, deserialize_with = "lenient::text")]
    pub key: Option<String>,
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub theme: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub width: Option<String>,
    #[serde(default)]
    pub background_image: Option<Value>,
}

/// An image with the identity needed for an object marker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomImage {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub src: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub alt: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeroCarouselSection {
    #[serde(flatten)]
    pub base: SectionBase,
    #[serde(default, deserialize_with = "lenient::list")]
    pub banners: Vec<Banner>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub subtitle: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub button_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub button_link: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub badge: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub gradient: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoriesSection {
    #[serde(flatten)]
    pub base: SectionBase,
    #[serde(default, deserialize_with = "lenient::text")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub items: Vec<Story>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Story {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::record")]
    pub cover: Option<CustomImage>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Slide {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::record")]
    pub image: Option<CustomImage>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoriesSection {
    #[serde(flatten)]
    pub base: SectionBase,
    #[serde(default, deserialize_with = "lenient::text")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub items: Vec<CategoryItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryItem {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub count: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub gradient: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlashSaleSection {
    #[serde(flatten)]
    pub base: SectionBase,
    #[serde(default, deserialize_with = "lenient::text")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub subtitle: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub ends_in: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub items: Vec<FlashProduct>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlashProduct {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::record")]
    pub image: Option<CustomImage>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub original_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedProductsSection {
    #[serde(flatten)]
    pub base: SectionBase,
    #[serde(default, deserialize_with = "lenient::text")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub items: Vec<ProductCard>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::record")]
    pub image: Option<CustomImage>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub cta_label: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub product_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub variant_sku: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportSection {
    #[serde(flatten)]
    pub base: SectionBase,
    #[serde(default, deserialize_with = "lenient::text")]
    pub heading: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub items: Vec<SupportItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportItem {
    #[serde(rename = "_id", default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub action_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub action_link: Option<String>,
}

/// Field readers that never fail the document.
mod lenient {
    use serde::de::{DeserializeOwned, Deserializer};
    use serde::Deserialize;
    use serde_json::Value;

    /// A list. `null` or a non-list reads as empty; an entry that does not
    /// read keeps its slot as the default so indices still line up.
    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| T::deserialize(item).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Text; numbers and booleans are printed.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// A number; numeric text is parsed.
    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(T::deserialize(Value::deserialize(deserializer)?).ok())
    }
}
