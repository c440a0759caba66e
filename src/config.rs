//! Diary configuration module.
//!
//! Handles loading, validating, and merging `diary.toml`. Stock defaults are
//! overridden by whatever the user file specifies; a missing file means all
//! defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [diary]
//! roots = ["rabbits"]         # Active diary roots, searched in order
//! archive_subdir = "old"      # Archive under each root ("" to disable)
//!
//! [cache]
//! image_cooldown_secs = 60    # Min seconds between image rescans of a day
//! event_cooldown_secs = 60    # Min seconds between note rescans of a day
//! diary_cooldown_secs = 5     # Min seconds between day-directory rescans
//!
//! [thumbnail]
//! tile_width = 96             # Width of one hour in the strip (1-4096)
//! tile_height = 128           # Strip height
//!
//! [page]
//! template_dirs = ["."]       # Searched in order for the template file
//! template_file = "index.html"
//! api_endpoint = "/api/rabbits"  # Link prefix for drawings on the live page
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::day::DaySettings;
use crate::imaging::MAX_TILE_SIDE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "diary.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Diary configuration loaded from `diary.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiaryConfig {
    /// Where the day directories live.
    pub diary: LocationConfig,
    /// Rescan cooldowns.
    pub cache: CacheConfig,
    /// Strip thumbnail geometry.
    pub thumbnail: ThumbnailConfig,
    /// Page template and link settings.
    pub page: PageConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl DiaryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diary.roots.is_empty() {
            return Err(ConfigError::Validation(
                "diary.roots must not be empty".into(),
            ));
        }
        for (key, value) in [
            ("thumbnail.tile_width", self.thumbnail.tile_width),
            ("thumbnail.tile_height", self.thumbnail.tile_height),
        ] {
            if value == 0 || value > MAX_TILE_SIDE {
                return Err(ConfigError::Validation(format!(
                    "{key} must be 1-{MAX_TILE_SIDE}, got {value}"
                )));
            }
        }
        if self.page.template_file.is_empty() {
            return Err(ConfigError::Validation(
                "page.template_file must not be empty".into(),
            ));
        }
        if self.page.template_dirs.is_empty() {
            return Err(ConfigError::Validation(
                "page.template_dirs must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Every root to scan: each configured root followed by its archive.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.diary
            .roots
            .iter()
            .flat_map(|root| {
                let root = PathBuf::from(root);
                let archive = (!self.diary.archive_subdir.is_empty())
                    .then(|| root.join(&self.diary.archive_subdir));
                std::iter::once(root).chain(archive)
            })
            .collect()
    }

    pub fn day_settings(&self) -> DaySettings {
        DaySettings {
            image_cooldown: Duration::from_secs(self.cache.image_cooldown_secs),
            event_cooldown: Duration::from_secs(self.cache.event_cooldown_secs),
            tile_width: self.thumbnail.tile_width,
            tile_height: self.thumbnail.tile_height,
        }
    }

    pub fn diary_cooldown(&self) -> Duration {
        Duration::from_secs(self.cache.diary_cooldown_secs)
    }

    pub fn template_dirs(&self) -> Vec<PathBuf> {
        self.page.template_dirs.iter().map(PathBuf::from).collect()
    }
}

/// Diary location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConfig {
    /// Active diary roots.
    pub roots: Vec<String>,
    /// Archive directory inside each root. Empty disables archives.
    pub archive_subdir: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            roots: vec!["rabbits".to_string()],
            archive_subdir: "old".to_string(),
        }
    }
}

/// Rescan cooldowns, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub image_cooldown_secs: u64,
    pub event_cooldown_secs: u64,
    pub diary_cooldown_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            image_cooldown_secs: 60,
            event_cooldown_secs: 60,
            diary_cooldown_secs: 5,
        }
    }
}

/// Strip thumbnail geometry, in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailConfig {
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            tile_width: 96,
            tile_height: 128,
        }
    }
}

/// Page template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    /// Directories searched, in order, for `template_file`.
    pub template_dirs: Vec<String>,
    pub template_file: String,
    /// Prefix of drawing and thumbnail links on the live page.
    pub api_endpoint: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            template_dirs: vec![".".to_string()],
            template_file: "index.html".to_string(),
            api_endpoint: "/api/rabbits".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent or null, defaults to the number of CPU cores.
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

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(DiaryConfig::default())?)
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
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<DiaryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: DiaryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<DiaryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `diary.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Rabbit Diary Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Diary location
# ---------------------------------------------------------------------------
[diary]
# Directories holding one YYYY-MM-DD directory per day, searched in order.
# When the same day exists in two roots, the first one wins.
roots = ["rabbits"]

# Archive directory inside each root, scanned after it. "" disables archives.
archive_subdir = "old"

# ---------------------------------------------------------------------------
# Rescan cooldowns
# ---------------------------------------------------------------------------
[cache]
# Minimum seconds between two rescans of a day's drawings.
image_cooldown_secs = 60

# Minimum seconds between two rescans of a day's notes.
event_cooldown_secs = 60

# Minimum seconds between two rescans of the diary roots.
diary_cooldown_secs = 5

# ---------------------------------------------------------------------------
# Strip thumbnail
# ---------------------------------------------------------------------------
[thumbnail]
# Size of one hour's tile, 1 to 4096 pixels per side. The strip is 24 tiles wide.
tile_width = 96
tile_height = 128

# ---------------------------------------------------------------------------
# Page rendering
# ---------------------------------------------------------------------------
[page]
# Directories searched, in order, for the template file.
template_dirs = ["."]
template_file = "index.html"

# Link prefix for drawings and thumbnails on the live page.
api_endpoint = "/api/rabbits"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers (decoding, counting, page rendering).
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
