//! Configuration management for readalong

pub mod file;

use std::path::Path;
use std::time::Duration;

use crate::content::ContentTree;
use crate::playback::{AudioClock, Narrator};
use crate::segment::{PauseText, Segmenter, TableOrder};
use crate::sync::{DEFAULT_LATENCY_BIAS, HighlightController, Resolver, ScrollBand};
use crate::voice::{DEFAULT_VOICE, find_voice};
use crate::{Error, Result};

use file::ReadalongConfigFile;

/// Slowest and fastest speaking rates the service accepts
pub const RATE_RANGE: (f64, f64) = (0.5, 2.0);

/// Readalong configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Content location
    pub content: ContentConfig,

    /// Synthesis service
    pub synthesis: SynthesisConfig,

    /// Playhead resolution
    pub sync: SyncConfig,

    /// No-scroll band for the highlight
    pub scroll_band: ScrollBand,

    /// Text inserted for each pause kind
    pub pauses: PauseText,

    /// Table reading order
    pub table_order: TableOrder,
}

/// Content location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentConfig {
    /// CSS selector of the root content element
    pub selector: String,
}

/// Synthesis service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Service root URL
    pub api_url: String,

    /// Voice identifier
    pub voice: String,

    /// Speaking rate multiplier (0.5 to 2.0)
    pub rate: f64,

    /// Request timeout
    pub timeout: Duration,
}

/// Playhead resolution configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Forward bias compensating for output latency
    pub latency_bias: Duration,

    /// Frame callbacks per second
    pub frame_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content: ContentConfig {
                selector: "article".to_string(),
            },
            synthesis: SynthesisConfig {
                api_url: "http://localhost:8002".to_string(),
                voice: DEFAULT_VOICE.to_string(),
                rate: 1.0,
                timeout: Duration::from_secs(60),
            },
            sync: SyncConfig {
                latency_bias: DEFAULT_LATENCY_BIAS,
                frame_rate: 60,
            },
            scroll_band: ScrollBand::default(),
            pauses: PauseText::default(),
            table_order: TableOrder::default(),
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// With `path`, that file must exist and parse. Without it the standard
    /// location is used when present.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded or the
    /// resulting values are invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(path) => file::read_config_file(path)?,
            None => file::load_config_file(),
        };
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with values from `env`
    ///
    /// # Errors
    ///
    /// Returns `Config` if a value is out of range or unparsable
    pub fn resolve(fc: ReadalongConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let content = ContentConfig {
            selector: env("READALONG_SELECTOR")
                .or(fc.content.selector)
                .unwrap_or(defaults.content.selector),
        };

        let rate = parse_env(&env, "READALONG_RATE")?
            .or(fc.synthesis.rate)
            .unwrap_or(defaults.synthesis.rate);
        let synthesis = SynthesisConfig {
            api_url: env("READALONG_API_URL")
                .or(fc.synthesis.api_url)
                .unwrap_or(defaults.synthesis.api_url),
            voice: env("READALONG_VOICE")
                .or(fc.synthesis.voice)
                .unwrap_or(defaults.synthesis.voice),
            rate: clamp_rate(rate),
            timeout: parse_env(&env, "READALONG_TIMEOUT_SECS")?
                .or(fc.synthesis.timeout_secs)
                .map_or(defaults.synthesis.timeout, Duration::from_secs),
        };

        let sync = SyncConfig {
            latency_bias: parse_env(&env, "READALONG_LATENCY_BIAS_MS")?
                .or(fc.sync.latency_bias_ms)
                .map_or(defaults.sync.latency_bias, Duration::from_millis),
            frame_rate: parse_env(&env, "READALONG_FRAME_RATE")?
                .or(fc.sync.frame_rate)
                .unwrap_or(defaults.sync.frame_rate),
        };

        let scroll_band = ScrollBand {
            top: fc.highlight.scroll_top.unwrap_or(defaults.scroll_band.top),
            bottom: fc.highlight.scroll_bottom.unwrap_or(defaults.scroll_band.bottom),
        };

        let table_order = match env("READALONG_TABLE_ORDER") {
            Some(value) => parse_table_order(&value)?,
            None => fc.tables.reading_order.unwrap_or(defaults.table_order),
        };

        let config = Self {
            content,
            synthesis,
            sync,
            scroll_band,
            pauses: fc.pauses.unwrap_or(defaults.pauses),
            table_order,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first violated constraint
    pub fn validate(&self) -> Result<()> {
        let band = self.scroll_band;
        if !(0.0..=1.0).contains(&band.top) || !(0.0..=1.0).contains(&band.bottom) {
            return Err(Error::Config(format!(
                "scroll band must lie within the viewport, got {}..{}",
                band.top, band.bottom
            )));
        }
        if band.top > band.bottom {
            return Err(Error::Config(format!(
                "scroll band top {} is below bottom {}",
                band.top, band.bottom
            )));
        }
        if self.sync.frame_rate == 0 {
            return Err(Error::Config("frame rate must be positive".to_string()));
        }
        if self.content.selector.trim().is_empty() {
            return Err(Error::Config("content selector is empty".to_string()));
        }
        if find_voice(&self.synthesis.voice).is_none() {
            tracing::warn!(voice = %self.synthesis.voice, "voice not in catalog, passing it through");
        }
        Ok(())
    }

    /// Segmenter using the configured pauses and table order
    #[must_use]
    pub fn segmenter(&self) -> Segmenter {
        Segmenter::new(self.pauses.clone(), self.table_order)
    }

    /// Resolver using the configured latency bias
    #[must_use]
    pub const fn resolver(&self) -> Resolver {
        Resolver::new(self.sync.latency_bias)
    }

    /// Highlight controller using the configured scroll band
    #[must_use]
    pub const fn highlight(&self) -> HighlightController {
        HighlightController::new(self.scroll_band)
    }

    /// Idle narrator over `tree` with every tunable taken from this config
    #[must_use]
    pub fn narrator<C: AudioClock>(&self, tree: ContentTree, clock: C) -> Narrator<C> {
        Narrator::new(tree, clock, self.synthesis.voice.clone(), self.synthesis.rate)
            .with_segmenter(self.segmenter())
            .with_resolver(self.resolver())
            .with_highlight(self.highlight())
    }
}

/// Clamp a speaking rate into [`RATE_RANGE`]
#[must_use]
pub fn clamp_rate(rate: f64) -> f64 {
    let (min, max) = RATE_RANGE;
    if rate.is_nan() {
        return 1.0;
    }
    let clamped = rate.clamp(min, max);
    if (clamped - rate).abs() > f64::EPSILON {
        tracing::warn!(rate, clamped, "speaking rate out of range");
    }
    clamped
}

fn parse_env<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    env(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid value for {key}: {value}")))
        })
        .transpose()
}

fn parse_table_order(value: &str) -> Result<TableOrder> {
    match value.trim() {
        "column-major" => Ok(TableOrder::ColumnMajor),
        "row-major" => Ok(TableOrder::RowMajor),
        other => Err(Error::Config(format!("unknown table order: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve_with(fc: ReadalongConfigFile, vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::resolve(fc, |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_widget() {
        let config = resolve_with(ReadalongConfigFile::default(), &[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.content.selector, "article");
        assert_eq!(config.synthesis.api_url, "http://localhost:8002");
        assert_eq!(config.sync.latency_bias, Duration::from_millis(50));
        assert_eq!(config.table_order, TableOrder::ColumnMajor);
    }

    #[test]
    fn env_overrides_file() {
        let mut fc = ReadalongConfigFile::default();
        fc.synthesis.voice = Some("en-US-GuyNeural".to_string());
        fc.content.selector = Some("main".to_string());

        let config = resolve_with(fc, &[("READALONG_VOICE", "en-GB-SoniaNeural")]).unwrap();
        assert_eq!(config.synthesis.voice, "en-GB-SoniaNeural");
        assert_eq!(config.content.selector, "main");
    }

    #[test]
    fn rate_is_clamped() {
        let config = resolve_with(ReadalongConfigFile::default(), &[("READALONG_RATE", "3.5")]).unwrap();
        assert!((config.synthesis.rate - 2.0).abs() < f64::EPSILON);
        assert!((clamp_rate(0.1) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_env_value_is_config_error() {
        let err = resolve_with(ReadalongConfigFile::default(), &[("READALONG_FRAME_RATE", "fast")])
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(resolve_with(ReadalongConfigFile::default(), &[("READALONG_TABLE_ORDER", "diagonal")]).is_err());
    }

    #[test]
    fn inverted_scroll_band_is_rejected() {
        let mut fc = ReadalongConfigFile::default();
        fc.highlight.scroll_top = Some(0.8);
        fc.highlight.scroll_bottom = Some(0.2);
        assert!(resolve_with(fc, &[]).is_err());
    }

    #[test]
    fn table_order_from_env() {
        let config =
            resolve_with(ReadalongConfigFile::default(), &[("READALONG_TABLE_ORDER", "row-major")]).unwrap();
        assert_eq!(config.table_order, TableOrder::RowMajor);
    }
}
