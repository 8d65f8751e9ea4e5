// THEORY:
// The engine has exactly two failure families. Configuration mistakes are programmer
// errors and surface as `ConfigError` the moment an engine is built from a bad value.
// Everything at the boundary (payload parsing, PNG encoding, the external fetch layer)
// is wrapped by `GlyphError`. Poor data quality is never an error: aggregators degrade
// to empty or neutral outputs and only counters change.

use thiserror::Error;

/// Result alias used across the crate.
pub type GlyphResult<T> = Result<T, GlyphError>;

/// Invalid tuning values, caught when a config is validated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{field}` must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("`{field}` must lie in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },

    #[error("alpha range is inverted: min {min} > max {max}")]
    InvertedAlpha { min: f64, max: f64 },

    #[error("`{field}` must be at least 1")]
    Zero { field: &'static str },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-level error for everything that crosses the engine boundary.
#[derive(Debug, Error)]
pub enum GlyphError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("display size must be positive and finite, got {width}x{height}")]
    InvalidDisplay { width: f64, height: f64 },

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to encode raster: {0}")]
    Image(#[from] image::ImageError),

    #[error("data source failed: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GlyphError {
    /// Wraps an error raised by the external data source.
    pub fn fetch<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GlyphError::Fetch(Box::new(err))
    }
}
