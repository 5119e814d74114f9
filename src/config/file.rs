//! TOML configuration file loading
//!
//! Supports `~/.config/readalong/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::segment::{PauseText, TableOrder};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ReadalongConfigFile {
    /// Where the readable content lives
    #[serde(default)]
    pub content: ContentFileConfig,

    /// Synthesis service
    #[serde(default)]
    pub synthesis: SynthesisFileConfig,

    /// Playhead resolution
    #[serde(default)]
    pub sync: SyncFileConfig,

    /// Highlight scrolling
    #[serde(default)]
    pub highlight: HighlightFileConfig,

    /// Text inserted for each pause kind
    #[serde(default)]
    pub pauses: Option<PauseText>,

    /// Table reading
    #[serde(default)]
    pub tables: TablesFileConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentFileConfig {
    /// CSS selector of the root content element (e.g. "article")
    pub selector: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SynthesisFileConfig {
    /// Service root (e.g. "http://localhost:8002")
    pub api_url: Option<String>,

    /// Voice identifier (e.g. "en-AU-NatashaNeural")
    pub voice: Option<String>,

    /// Speaking rate multiplier
    pub rate: Option<f64>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncFileConfig {
    /// Forward bias applied to the playhead, in milliseconds
    pub latency_bias_ms: Option<u64>,

    /// Frame callbacks per second
    pub frame_rate: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HighlightFileConfig {
    /// Top of the no-scroll band, as a fraction of viewport height
    pub scroll_top: Option<f64>,

    /// Bottom of the no-scroll band, as a fraction of viewport height
    pub scroll_bottom: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TablesFileConfig {
    /// "column-major" or "row-major"
    pub reading_order: Option<TableOrder>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ReadalongConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ReadalongConfigFile {
    let Some(path) = config_file_path() else {
        return ReadalongConfigFile::default();
    };

    if !path.exists() {
        return ReadalongConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ReadalongConfigFile::default()
        }
    }
}

/// Read and parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<ReadalongConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/readalong/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("readalong").join("config.toml"))
}
