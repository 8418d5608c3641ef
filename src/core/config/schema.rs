//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$ANNOTRACE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/annotrace/config.toml`
//! 3. `~/.annotrace/config.toml`
//!
//! # Project Config
//!
//! Located at `annotrace.toml` or `.annotrace/config.toml` in the project
//! directory.
//!
//! # Validation
//!
//! Config values are validated after parsing: attribute names must be usable
//! as HTML attribute names and pages must name both of their inputs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default attribute carrying a field marker.
pub const DEFAULT_FIELD_ATTRIBUTE: &str = "data-sb-field-path";

/// Default attribute carrying an object marker.
pub const DEFAULT_OBJECT_ATTRIBUTE: &str = "data-sb-object-id";

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// [markers]
/// field_attribute = "data-sb-field-path"
/// object_attribute = "data-sb-object-id"
///
/// [output]
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Marker attribute names
    pub markers: Option<MarkerConfig>,

    /// Report output defaults
    pub output: Option<OutputConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(markers) = &self.markers {
            markers.validate()?;
        }
        if let Some(output) = &self.output {
            output.validate()?;
        }
        Ok(())
    }
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// declarations = "content-model.toml"
///
/// [markers]
/// field_attribute = "data-field"
///
/// [[pages]]
/// name = "home"
/// document = "content/home.json"
/// render = "build/home.tree.json"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Marker attribute overrides
    pub markers: Option<MarkerConfig>,

    /// Content document / render tree pairs to validate
    pub pages: Vec<PageConfig>,

    /// Content-type declarations file
    pub declarations: Option<PathBuf>,
}

impl ProjectConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(markers) = &self.markers {
            markers.validate()?;
        }

        for (i, page) in self.pages.iter().enumerate() {
            if page.document.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "pages[{}]: document cannot be empty",
                    i
                )));
            }
            if page.render.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "pages[{}]: render cannot be empty",
                    i
                )));
            }
        }

        if let Some(decl) = &self.declarations {
            if decl.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "declarations cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Marker attribute names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerConfig {
    /// Attribute carrying field markers
    pub field_attribute: Option<String>,

    /// Attribute carrying object markers
    pub object_attribute: Option<String>,
}

impl MarkerConfig {
    /// Validate the attribute names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in [&self.field_attribute, &self.object_attribute]
            .into_iter()
            .flatten()
        {
            if !is_attribute_name(name) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid marker attribute name '{}'",
                    name
                )));
            }
        }

        if let (Some(field), Some(object)) = (&self.field_attribute, &self.object_attribute) {
            if field == object {
                return Err(ConfigError::InvalidValue(format!(
                    "field and object markers cannot share the attribute '{}'",
                    field
                )));
            }
        }

        Ok(())
    }
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// Report output defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// "text" or "json"
    pub format: Option<String>,
}

impl OutputConfig {
    /// Valid report formats.
    pub const VALID_FORMATS: &'static [&'static str] = &["text", "json"];

    /// Validate the output configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(format) = &self.format {
            if !Self::VALID_FORMATS.contains(&format.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid output format '{}', must be one of: {}",
                    format,
                    Self::VALID_FORMATS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// One page to validate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PageConfig {
    /// Label used in reports (defaults to the document file stem)
    #[serde(default)]
    pub name: Option<String>,

    /// Content document path
    pub document: PathBuf,

    /// Render tree path
    pub render: PathBuf,
}
