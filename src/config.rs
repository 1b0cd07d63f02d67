//! Build configuration.
//!
//! One optional TOML file (default `cascade.toml` in the working directory)
//! layered over stock defaults, then over that the command-line flags.
//!
//! ```text
//! stock defaults ──merge──▶ cascade.toml ──override──▶ --source/--target/...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source = "src"        # Source tree
//! target = "tgt"        # Output tree (created as needed)
//! index_key = "files"   # Template variable holding the Site Index
//!
//! [serve]
//! address = "127.0.0.1"
//! port = 8080
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "cascade.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything a build (and the preview server) needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Root of the source tree.
    pub source: PathBuf,
    /// Root of the output tree.
    pub target: PathBuf,
    /// Name under which templates see the Site Index.
    pub index_key: String,
    pub serve: ServeConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            target: PathBuf::from("tgt"),
            index_key: "files".to_string(),
            serve: ServeConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Reject settings no build could succeed with.
    ///
    /// Whether `source` exists is checked when the build starts, not here:
    /// `gen-config` and `--help` must work from any directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_key.trim().is_empty() {
            return Err(ConfigError::Validation("index_key must not be empty".into()));
        }
        if self.source == self.target {
            return Err(ConfigError::Validation(format!(
                "source and target must differ (both are {})",
                self.source.display()
            )));
        }
        if self.serve.port == 0 {
            return Err(ConfigError::Validation("serve.port must be non-zero".into()));
        }
        Ok(())
    }
}

/// Preview server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServeConfig {
    /// `address:port`, as accepted by the HTTP server.
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BuildConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value; `Ok(None)` when it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load a config file over the stock defaults and validate the result.
///
/// A missing file is not an error: the defaults are returned.
pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(path)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub index_key: Option<String>,
    pub port: Option<u16>,
}

impl BuildConfig {
    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(source) = overrides.source {
            self.source = source;
        }
        if let Some(target) = overrides.target {
            self.target = target;
        }
        if let Some(index_key) = overrides.index_key {
            self.index_key = index_key;
        }
        if let Some(port) = overrides.port {
            self.serve.port = port;
        }
        self.validate()?;
        Ok(self)
    }
}

/// A fully-commented stock `cascade.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Cascade Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags (--source, --target, --index-key, --port) override
# anything set here. Unknown keys will cause an error.

# Source tree: pages (.html, .md), directory metadata (.json),
# fragments (.source, .template) and assets.
source = "src"

# Output tree. Created as needed; existing files are overwritten.
# May live inside the source tree, in which case it is never walked.
# Must not be the source tree (or contain it), however it is spelled.
target = "tgt"

# Template variable holding the Site Index, e.g.
#   {% for post in files.blog | sorted %}
#
# Templates fail on keys a page does not define. Shared templates guard
# optional keys:
#   {{ title | default(value="") }}
# and page templates print the Markdown with {{ content | safe }}.
index_key = "files"

# ---------------------------------------------------------------------------
# Preview server (cascade serve)
# ---------------------------------------------------------------------------
[serve]
address = "127.0.0.1"
port = 8080
"##
}
