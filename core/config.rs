use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILENAME: &str = "repoflat.toml";

/// Default maximum file size to render, matching the 50 KiB cutoff most
/// flatteners use. Files at or above this are listed but never loaded.
pub const DEFAULT_SIZE_THRESHOLD: u64 = 50 * 1024;

/// Configuration for one flattening run.
///
/// Every field has a serde default so a partial `repoflat.toml` (or none
/// at all) is valid; the CLI merges flag overrides on top of whatever was
/// loaded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Files with size >= this many bytes are skipped as oversized.
    #[serde(default = "default_size_threshold")]
    pub size_threshold_bytes: u64,

    /// Glob patterns excluded from the walk, relative to the scan root.
    #[serde(default)]
    pub exclude_globs: Vec<String>,

    /// Strip comments/insignificant whitespace from corpus content.
    #[serde(default = "default_false")]
    pub minify: bool,

    /// Produce only the corpus document, no HTML.
    #[serde(default = "default_false")]
    pub llm_only: bool,

    /// Follow symbolic links while walking. Off by default to avoid cycles.
    #[serde(default = "default_false")]
    pub follow_symlinks: bool,

    /// Honor .gitignore / .ignore files during the walk.
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
}

fn default_size_threshold() -> u64 {
    DEFAULT_SIZE_THRESHOLD
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD,
            exclude_globs: Vec::new(),
            minify: false,
            llm_only: false,
            follow_symlinks: false,
            use_gitignore: true,
        }
    }
}

impl RenderConfig {
    /// Load a config from a TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        log::debug!("Loading config from: {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| AppError::EntryRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: RenderConfig = toml::from_str(&content)?;
        log::trace!("Config loaded: {:?}", config);
        Ok(config)
    }

    /// Resolve the effective config for a scan root: an explicit file wins,
    /// otherwise `<root>/repoflat.toml` if present, otherwise defaults.
    pub fn resolve(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(AppError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_path(path);
        }
        let default_path = root.join(DEFAULT_CONFIG_FILENAME);
        if default_path.is_file() {
            Self::load_from_path(&default_path)
        } else {
            log::trace!("No config file found, using defaults.");
            Ok(Self::default())
        }
    }
}
