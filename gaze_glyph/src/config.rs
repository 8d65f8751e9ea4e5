// THEORY:
// Every tunable constant of the engine lives here with its documented default. The
// struct tree mirrors the engines it feeds: the data space shared by everything, the
// heatmap raster, the contour overlay, and the radial glyph aggregators.
//
// A config is plain data until `validate` accepts it. Engines only take validated
// configs, so a non-positive sigma or an empty bucket range fails loudly at build time
// instead of producing NaN rasters later. Partial TOML files are fine: every section
// and field falls back to its default.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The fixed logical coordinate system all raw coordinates are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSpace {
    pub width: f64,
    pub height: f64,
}

impl Default for DataSpace {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Tuning for the accumulate/blur/colorize heatmap engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Internal grid cells per display pixel along each axis.
    pub resolution: f64,
    /// Gaussian standard deviation in grid cells.
    pub sigma: f64,
    /// Normalized density below which a cell is fully transparent.
    pub threshold: f64,
    /// Opacity at the threshold.
    pub alpha_min: f64,
    /// Opacity at the density peak.
    pub alpha_max: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            resolution: 2.0,
            sigma: 35.0,
            threshold: 0.08,
            alpha_min: 0.3,
            alpha_max: 0.7,
        }
    }
}

/// Tuning for the density contour overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Smoothing bandwidth in display pixels.
    pub bandwidth: f64,
    /// Number of iso-levels between zero and the density peak.
    pub levels: usize,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            bandwidth: 20.0,
            levels: 20,
        }
    }
}

/// Tuning for the radial glyph aggregators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphConfig {
    /// Number of time buckets; the last one absorbs every later event.
    pub bucket_count: usize,
    /// Width of one time bucket in seconds.
    pub bucket_width: f64,
    /// Saccades shorter than this on both axes are ignored.
    pub noise_floor: f64,
    pub min_selection_width: f64,
    pub min_selection_height: f64,
    /// Mean reported for an empty score population.
    pub empty_mean: f64,
    /// Duration assumed for fixations whose duration is not a finite number.
    pub missing_duration: f64,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            bucket_count: 16,
            bucket_width: 1.0,
            noise_floor: 1.0,
            min_selection_width: 40.0,
            min_selection_height: 40.0,
            empty_mean: 5.0,
            missing_duration: 0.1,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data_space: DataSpace,
    pub heatmap: HeatmapConfig,
    pub contours: ContourConfig,
    pub glyph: GlyphConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.data_space.validate()?;
        self.heatmap.validate()?;
        self.contours.validate()?;
        self.glyph.validate()
    }
}

impl DataSpace {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("data_space.width", self.width)?;
        positive("data_space.height", self.height)
    }
}

impl HeatmapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("heatmap.resolution", self.resolution)?;
        positive("heatmap.sigma", self.sigma)?;
        if !(0.0..1.0).contains(&self.threshold) {
            return Err(ConfigError::OutOfRange {
                field: "heatmap.threshold",
                range: "[0, 1)",
                value: self.threshold,
            });
        }
        unit_interval("heatmap.alpha_min", self.alpha_min)?;
        unit_interval("heatmap.alpha_max", self.alpha_max)?;
        if self.alpha_min > self.alpha_max {
            return Err(ConfigError::InvertedAlpha {
                min: self.alpha_min,
                max: self.alpha_max,
            });
        }
        Ok(())
    }
}

impl ContourConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("contours.bandwidth", self.bandwidth)?;
        if self.levels == 0 {
            return Err(ConfigError::Zero {
                field: "contours.levels",
            });
        }
        Ok(())
    }
}

impl GlyphConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_count == 0 {
            return Err(ConfigError::Zero {
                field: "glyph.bucket_count",
            });
        }
        positive("glyph.bucket_width", self.bucket_width)?;
        non_negative("glyph.noise_floor", self.noise_floor)?;
        non_negative("glyph.min_selection_width", self.min_selection_width)?;
        non_negative("glyph.min_selection_height", self.min_selection_height)?;
        non_negative("glyph.missing_duration", self.missing_duration)?;
        if !self.empty_mean.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "glyph.empty_mean",
                range: "finite values",
                value: self.empty_mean,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            range: "[0, inf)",
            value,
        })
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            range: "[0, 1]",
            value,
        })
    }
}
