//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! annotrace has two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Settings next to the pages being checked
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$ANNOTRACE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/annotrace/config.toml`
//! 3. `~/.annotrace/config.toml`
//!
//! # Project Config Locations
//!
//! Searched in order:
//! 1. `annotrace.toml`
//! 2. `.annotrace/config.toml`
//!
//! When both exist the first wins and a warning is produced.
//!
//! # Example
//!
//! ```no_run
//! use annotrace::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/site"))).unwrap();
//! let config = result.config;
//!
//! println!("Field marker: {}", config.field_attribute());
//! for page in config.pages() {
//!     println!("{} -> {}", page.document.display(), page.render.display());
//! }
//! ```

pub mod schema;

pub use schema::{GlobalConfig, MarkerConfig, OutputConfig, PageConfig, ProjectConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use schema::{DEFAULT_FIELD_ATTRIBUTE, DEFAULT_OBJECT_ATTRIBUTE};

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: project config overrides global
/// config, which overrides the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if found)
    pub project: Option<ProjectConfig>,
    /// Directory project-relative paths are resolved against
    project_root: Option<PathBuf>,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads project config from it.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(project_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with(Self::find_global().as_deref(), project_dir)
    }

    /// Load configuration from an explicit global config file.
    ///
    /// `global_file` of `None` means no global config.
    pub fn load_with(
        global_file: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match global_file {
            Some(path) => (read_toml::<GlobalConfig>(path)?, Some(path.to_path_buf())),
            None => (GlobalConfig::default(), None),
        };

        let (project, project_path) = match project_dir {
            Some(dir) => Self::load_project(dir, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                project_root: project_dir.map(Path::to_path_buf),
                global_path,
                project_path,
            },
            warnings,
        })
    }

    /// Locate the global config file, if any.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ANNOTRACE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("annotrace/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".annotrace/config.toml"))
            .filter(|path| path.exists())
    }

    fn load_project(
        dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<ProjectConfig>, Option<PathBuf>), ConfigError> {
        let top = dir.join("annotrace.toml");
        let nested = dir.join(".annotrace/config.toml");

        let chosen = match (top.exists(), nested.exists()) {
            (true, true) => {
                warnings.push(ConfigWarning {
                    message: format!(
                        "Both project config files exist; ignoring '{}'",
                        nested.display()
                    ),
                    path: nested.clone(),
                });
                top
            }
            (true, false) => top,
            (false, true) => nested,
            (false, false) => return Ok((None, None)),
        };

        let config = read_toml::<ProjectConfig>(&chosen)?;
        Ok((Some(config), Some(chosen)))
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn marker_setting(&self, pick: impl Fn(&MarkerConfig) -> Option<&String>) -> Option<&str> {
        let project = self
            .project
            .as_ref()
            .and_then(|p| p.markers.as_ref())
            .and_then(&pick);
        let global = self.global.markers.as_ref().and_then(&pick);
        project.or(global).map(String::as_str)
    }

    /// Attribute carrying field markers.
    ///
    /// Defaults to `data-sb-field-path`.
    pub fn field_attribute(&self) -> &str {
        self.marker_setting(|m| m.field_attribute.as_ref())
            .unwrap_or(DEFAULT_FIELD_ATTRIBUTE)
    }

    /// Attribute carrying object markers.
    ///
    /// Defaults to `data-sb-object-id`.
    pub fn object_attribute(&self) -> &str {
        self.marker_setting(|m| m.object_attribute.as_ref())
            .unwrap_or(DEFAULT_OBJECT_ATTRIBUTE)
    }

    /// Check if reports default to JSON.
    ///
    /// Defaults to `false` if not configured.
    pub fn json_output(&self) -> bool {
        self.global
            .output
            .as_ref()
            .and_then(|o| o.format.as_deref())
            == Some("json")
    }

    /// Configured pages, with paths resolved against the project directory.
    pub fn pages(&self) -> Vec<PageConfig> {
        self.project
            .iter()
            .flat_map(|p| p.pages.iter())
            .map(|page| PageConfig {
                name: page.name.clone(),
                document: self.resolve(&page.document),
                render: self.resolve(&page.render),
            })
            .collect()
    }

    /// Configured declarations file, resolved against the project directory.
    pub fn declarations(&self) -> Option<PathBuf> {
        self.project
            .as_ref()
            .and_then(|p| p.declarations.as_ref())
            .map(|d| self.resolve(d))
    }

    /// Resolve a path against the project directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.project_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_empty_defaults() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_with(None, Some(temp.path())).unwrap();
        let config = result.config;

        assert!(config.project.is_none());
        assert_eq!(config.field_attribute(), "data-sb-field-path");
        assert_eq!(config.object_attribute(), "data-sb-object-id");
        assert!(!config.json_output());
        assert!(config.pages().is_empty());
        assert!(config.declarations().is_none());
    }

    #[test]
    fn load_global_file() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
            [markers]
            field_attribute = "data-field"

            [output]
            format = "json"
            "#,
        )
        .unwrap();

        let result = Config::load_with(Some(&global), None).unwrap();
        let config = result.config;

        assert_eq!(config.field_attribute(), "data-field");
        assert_eq!(config.object_attribute(), "data-sb-object-id");
        assert!(config.json_output());
        assert_eq!(config.global_config_loaded_from(), Some(global.as_path()));
    }

    #[test]
    fn load_project_config_resolves_paths() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("annotrace.toml"),
            r#"
            declarations = "model.json"

            [[pages]]
            document = "content/home.json"
            render = "/abs/home.tree.json"
            "#,
        )
        .unwrap();

        let result = Config::load_with(None, Some(temp.path())).unwrap();
        let config = result.config;
        let pages = config.pages();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].document, temp.path().join("content/home.json"));
        assert_eq!(pages[0].render, PathBuf::from("/abs/home.tree.json"));
        assert_eq!(config.declarations(), Some(temp.path().join("model.json")));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn nested_location_is_found() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".annotrace")).unwrap();
        fs::write(
            temp.path().join(".annotrace/config.toml"),
            "declarations = \"model.toml\"",
        )
        .unwrap();

        let result = Config::load_with(None, Some(temp.path())).unwrap();
        assert!(result.config.declarations().is_some());
    }

    #[test]
    fn both_locations_warn() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".annotrace")).unwrap();
        fs::write(temp.path().join("annotrace.toml"), "").unwrap();
        fs::write(temp.path().join(".annotrace/config.toml"), "").unwrap();

        let result = Config::load_with(None, Some(temp.path())).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("ignoring"));
    }

    #[test]
    fn project_overrides_global_markers() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        fs::write(
            &global,
            "[markers]\nfield_attribute = \"data-a\"\nobject_attribute = \"data-b\"",
        )
        .unwrap();
        fs::write(
            temp.path().join("annotrace.toml"),
            "[markers]\nfield_attribute = \"data-c\"",
        )
        .unwrap();

        let config = Config::load_with(Some(&global), Some(temp.path()))
            .unwrap()
            .config;
        assert_eq!(config.field_attribute(), "data-c");
        assert_eq!(config.object_attribute(), "data-b");
    }

    #[test]
    fn invalid_value_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("annotrace.toml"),
            "[markers]\nfield_attribute = \"has space\"",
        )
        .unwrap();

        let result = Config::load_with(None, Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("annotrace.toml"),
            "declarations = \"m.toml\"\nunknown_field = true",
        )
        .unwrap();

        let result = Config::load_with(None, Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
