//! Error types for the shadow core
//!
//! Only setup paths return errors. The per-frame path never fails: it
//! degrades to an unshadowed light or a placeholder atlas instead.

use thiserror::Error;

/// Shadow settings failed validation or parsing
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Cascade count outside 1-4
    #[error("Cascade count must be between 1 and {max}, got {count}")]
    CascadeCount { count: u32, max: u32 },

    /// Cascade ratios out of [0, 1] or decreasing
    #[error("Cascade ratios must be non-decreasing within [0, 1], got {0:?}")]
    CascadeRatios([f32; 3]),

    /// Cascade fade outside [0, 1]
    #[error("Cascade fade must be within [0, 1], got {0}")]
    CascadeFade(f32),

    /// Non-positive distance
    #[error("{name} must be positive, got {value}")]
    Distance { name: &'static str, value: f32 },

    /// JSON parse failure
    #[error("Invalid shadow settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse failure
    #[error("Invalid shadow settings TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level error for the render crate
#[derive(Debug, Error)]
pub enum RenderError {
    /// Settings were rejected
    #[error("Shadow configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Settings file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings file extension is neither `.json` nor `.toml`
    #[error("Unsupported settings format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for render setup operations
pub type Result<T> = std::result::Result<T, RenderError>;
