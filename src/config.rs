//! Compiler configuration module.
//!
//! Handles loading, validating, and merging `albummer.toml`. Stock defaults
//! reproduce the classic behaviour of the album compiler; a config file only
//! needs to name the values it wants to change.
//!
//! ## Config File Location
//!
//! The file is looked up next to the album document being compiled:
//!
//! ```text
//! trips/
//! ├── albummer.toml        # Optional, applies to every album in trips/
//! ├── lisbon.alb
//! └── porto.alb
//! ```
//!
//! `albummer generate --config other.toml` points at an explicit file instead.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [media]
//! image_extensions = ["png", "jpg", "jpeg"]
//! video_extensions = ["mp4"]
//!
//! [policy]
//! duplicate_basenames = "last-wins"  # or "reject"
//! unresolved_tokens = "drop"         # or "reject"
//!
//! [processing]
//! max_processes = 4         # Max parallel encoders (omit for auto = CPU cores)
//!
//! [template]
//! columns = 3               # Images per line in generated templates
//! order = "asc"             # "asc" = oldest first, "desc" = newest first
//! stylesheet = "album.css"  # Omit to use default.css next to the executable
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up next to the album document.
pub const CONFIG_FILE_NAME: &str = "albummer.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Compiler configuration loaded from `albummer.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlbumConfig {
    /// Extension tables used to classify discovered media.
    pub media: MediaConfig,
    /// How ambiguous lookups are resolved.
    pub policy: PolicyConfig,
    /// Parallel encoding settings.
    pub processing: ProcessingConfig,
    /// Defaults for `make-template`.
    pub template: TemplateConfig,
}

impl AlbumConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.media.validate()?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.template.columns == 0 {
            return Err(ConfigError::Validation(
                "template.columns must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fixed extension sets that decide what counts as media.
///
/// Extensions are stored lowercase and without the leading dot; file
/// extensions are lowercased before comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            image_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            video_extensions: vec!["mp4".into()],
        }
    }
}

impl MediaConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.image_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "media.image_extensions must not be empty".into(),
            ));
        }
        if self.video_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "media.video_extensions must not be empty".into(),
            ));
        }
        for ext in self.image_extensions.iter().chain(&self.video_extensions) {
            if ext.is_empty() || ext.starts_with('.') || *ext != ext.to_lowercase() {
                return Err(ConfigError::Validation(format!(
                    "media extension {ext:?} must be lowercase without a leading dot"
                )));
            }
        }
        let images: HashSet<&str> = self.image_extensions.iter().map(String::as_str).collect();
        if let Some(ext) = self
            .video_extensions
            .iter()
            .find(|ext| images.contains(ext.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "media extension {ext:?} is listed as both image and video"
            )));
        }
        Ok(())
    }
}

/// What to do when two files in the media tree share a basename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The file discovered last owns the name.
    #[default]
    LastWins,
    /// Abort discovery with an error.
    Reject,
}

/// What to do with tokens on a media row that name no catalog entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedPolicy {
    /// Silently leave the token out of the row.
    #[default]
    Drop,
    /// Abort parsing with an error.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub duplicate_basenames: DuplicatePolicy,
    pub unresolved_tokens: UnresolvedPolicy,
}

/// Parallel encoding settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel encoder threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Sort direction for scaffolded media, by modification time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    Asc,
    /// Newest first.
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    pub columns: usize,
    pub order: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            columns: 3,
            order: SortOrder::Asc,
            stylesheet: None,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AlbumConfig::default()).expect("default config must serialize")
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AlbumConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AlbumConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `albummer.toml` from the given directory, falling back to defaults.
pub fn load_config(dir: &Path) -> Result<AlbumConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Load an explicit config file. A missing file yields the defaults.
pub fn load_config_file(path: &Path) -> Result<AlbumConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `albummer.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Albummer Configuration
# ======================
#
# Place this file next to your .alb files as albummer.toml.
# Every key is optional; omitted keys keep the defaults shown here.

# ---------------------------------------------------------------------------
# Media classification
# ---------------------------------------------------------------------------
[media]
# Lowercase extensions, without the dot. Anything else in the media folder
# is ignored. PNG files embed as image/png, every other image as image/jpeg.
image_extensions = ["png", "jpg", "jpeg"]
# Videos embed as video/mp4.
video_extensions = ["mp4"]

# ---------------------------------------------------------------------------
# Lookup policies
# ---------------------------------------------------------------------------
[policy]
# Two files with the same name in different subfolders:
#   "last-wins" - the one found last is used
#   "reject"    - stop with an error
duplicate_basenames = "last-wins"
# A name on a media row that is not in the media folder:
#   "drop"   - leave it out of the row
#   "reject" - stop with an error
unresolved_tokens = "drop"

# ---------------------------------------------------------------------------
# Parallel encoding
# ---------------------------------------------------------------------------
[processing]
# Maximum encoder threads. Omit for one per CPU core.
# max_processes = 4

# ---------------------------------------------------------------------------
# make-template defaults
# ---------------------------------------------------------------------------
[template]
# Images per line; videos always get a line of their own.
columns = 3
# "asc" = oldest first, "desc" = newest first (by modification time).
order = "asc"
# Stylesheet written into the :use directive.
# Omit to use default.css next to the albummer executable.
# stylesheet = "album.css"
"##
}
