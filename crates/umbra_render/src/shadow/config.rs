//! Shadow Configuration
//!
//! Global and directional shadow settings with serde support for hot-reload.

use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{ConfigError, RenderError, Result};
use super::cascade::MAX_CASCADES;

/// Smallest atlas edge accepted by [`ShadowSettings::validate`]
pub const MIN_ATLAS_SIZE: u32 = 256;
/// Largest atlas edge accepted by [`ShadowSettings::validate`]
pub const MAX_ATLAS_SIZE: u32 = 8192;

/// Global shadow configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Maximum shadow distance from the camera
    pub max_distance: f32,

    /// Fraction of `max_distance` over which shadows fade out
    pub distance_fade: f32,

    /// Directional light shadow settings
    pub directional: DirectionalShadowSettings,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            max_distance: 100.0,
            distance_fade: 0.1,
            directional: DirectionalShadowSettings::default(),
        }
    }
}

/// Directional light shadow settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalShadowSettings {
    /// Shadow atlas edge length in texels (power of 2)
    pub atlas_size: u32,

    /// Shadow filter kernel
    pub filter: FilterMode,

    /// Cascade count (1-4)
    pub cascade_count: u32,

    /// Fraction of the shadow distance covered by the first three cascades
    pub cascade_ratios: [f32; 3],

    /// Fraction of each cascade over which it fades into the next
    pub cascade_fade: f32,

    /// How adjacent cascades are blended
    pub cascade_blend: CascadeBlendMode,
}

impl Default for DirectionalShadowSettings {
    fn default() -> Self {
        Self {
            atlas_size: 1024,
            filter: FilterMode::Pcf2x2,
            cascade_count: 4,
            cascade_ratios: [0.1, 0.25, 0.5],
            cascade_fade: 0.1,
            cascade_blend: CascadeBlendMode::Hard,
        }
    }
}

impl DirectionalShadowSettings {
    /// Culling factor handed to the draw call for each cascade
    ///
    /// Under-culls as the fade grows so casters in the blend region between
    /// two cascades are not dropped from the larger one.
    pub fn blend_culling_factor(&self) -> f32 {
        (0.8 - self.cascade_fade).max(0.0)
    }
}

impl ShadowSettings {
    /// Create a configuration for performance-bound targets
    pub fn low_quality() -> Self {
        Self {
            max_distance: 50.0,
            directional: DirectionalShadowSettings {
                atlas_size: 1024,
                filter: FilterMode::Pcf2x2,
                cascade_count: 2,
                cascade_ratios: [0.3, 0.3, 0.3],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create a high-quality configuration
    pub fn high_quality() -> Self {
        Self {
            max_distance: 150.0,
            directional: DirectionalShadowSettings {
                atlas_size: 4096,
                filter: FilterMode::Pcf5x5,
                cascade_count: 4,
                cascade_blend: CascadeBlendMode::Soft,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration and clamp values to valid ranges
    ///
    /// Non-finite values are replaced before clamping: distances and fades
    /// fall back to their defaults, a ratio to the ratio before it.
    pub fn validate(&mut self) {
        let defaults = Self::default();
        self.max_distance = finite_or(self.max_distance, defaults.max_distance).max(0.001);
        self.distance_fade = finite_or(self.distance_fade, defaults.distance_fade).clamp(0.001, 1.0);

        let dir = &mut self.directional;
        dir.atlas_size = dir.atlas_size.clamp(MIN_ATLAS_SIZE, MAX_ATLAS_SIZE).next_power_of_two();
        dir.cascade_count = dir.cascade_count.clamp(1, MAX_CASCADES as u32);
        dir.cascade_fade = finite_or(dir.cascade_fade, defaults.directional.cascade_fade).clamp(0.0, 1.0);

        let mut previous = 0.0f32;
        for ratio in dir.cascade_ratios.iter_mut() {
            *ratio = finite_or(*ratio, previous).clamp(previous, 1.0);
            previous = *ratio;
        }
    }

    /// Strict validation: report the first out-of-range value without fixing it
    pub fn check(&self) -> std::result::Result<(), ConfigError> {
        if !(self.max_distance > 0.0) {
            return Err(ConfigError::Distance { name: "max_distance", value: self.max_distance });
        }
        if !(self.distance_fade > 0.0) {
            return Err(ConfigError::Distance { name: "distance_fade", value: self.distance_fade });
        }

        let dir = &self.directional;
        if dir.cascade_count == 0 || dir.cascade_count > MAX_CASCADES as u32 {
            return Err(ConfigError::CascadeCount {
                count: dir.cascade_count,
                max: MAX_CASCADES as u32,
            });
        }

        let ratios = dir.cascade_ratios;
        let in_range = ratios.iter().all(|r| (0.0..=1.0).contains(r));
        let ordered = ratios.windows(2).all(|w| w[0] <= w[1]);
        if !in_range || !ordered {
            return Err(ConfigError::CascadeRatios(ratios));
        }

        if !(0.0..=1.0).contains(&dir.cascade_fade) {
            return Err(ConfigError::CascadeFade(dir.cascade_fade));
        }

        Ok(())
    }

    /// Parse JSON settings, then clamp the atlas size and check the rest
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.finish_parse()
    }

    /// Parse TOML settings, then clamp the atlas size and check the rest
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text)?;
        settings.finish_parse()
    }

    /// Load settings from a `.json` or `.toml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let settings = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            Some("toml") => Self::from_toml_str(&text)?,
            other => {
                return Err(RenderError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        log::info!(
            "Loaded shadow settings from {}: atlas {}, {} cascades",
            path.display(),
            settings.directional.atlas_size,
            settings.directional.cascade_count,
        );
        Ok(settings)
    }

    fn finish_parse(mut self) -> std::result::Result<Self, ConfigError> {
        self.check()?;
        // Any atlas size is usable once snapped to a supported power of two
        let requested = self.directional.atlas_size;
        self.validate();
        if requested != self.directional.atlas_size {
            log::warn!(
                "Shadow atlas size {} snapped to {}",
                requested,
                self.directional.atlas_size
            );
        }
        Ok(self)
    }
}

/// Percentage-closer filter kernel for directional shadows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Hardware 2x2 bilinear comparison only
    #[default]
    Pcf2x2,
    Pcf3x3,
    Pcf5x5,
    Pcf7x7,
}

impl FilterMode {
    /// Shader keywords selectable by the filter, in order
    pub const KEYWORDS: [&'static str; 3] = [
        "_DIRECTIONAL_PCF3",
        "_DIRECTIONAL_PCF5",
        "_DIRECTIONAL_PCF7",
    ];

    /// Ordinal used to widen the filter footprint (0 for 2x2)
    #[inline]
    pub fn ordinal(self) -> u32 {
        match self {
            Self::Pcf2x2 => 0,
            Self::Pcf3x3 => 1,
            Self::Pcf5x5 => 2,
            Self::Pcf7x7 => 3,
        }
    }

    /// Index into [`Self::KEYWORDS`], `None` when no keyword is enabled
    #[inline]
    pub fn keyword_index(self) -> Option<usize> {
        (self.ordinal() as usize).checked_sub(1)
    }
}

/// Transition between adjacent cascades
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CascadeBlendMode {
    /// Hard switch at the cascade boundary
    #[default]
    Hard,
    /// Cross-fade between the two cascades
    Soft,
    /// Dithered transition
    Dither,
}

impl CascadeBlendMode {
    /// Shader keywords selectable by the blend mode, in order
    pub const KEYWORDS: [&'static str; 2] = ["_CASCADE_BLEND_SOFT", "_CASCADE_BLEND_DITHER"];

    /// Index into [`Self::KEYWORDS`], `None` when no keyword is enabled
    #[inline]
    pub fn keyword_index(self) -> Option<usize> {
        match self {
            Self::Hard => None,
            Self::Soft => Some(0),
            Self::Dither => Some(1),
        }
    }
}

/// Shadow quality preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowQuality {
    Low,
    Medium,
    High,
    Ultra,
}

impl std::fmt::Display for ShadowQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Ultra => write!(f, "ultra"),
        }
    }
}

impl std::str::FromStr for ShadowQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "default" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "ultra" => Ok(Self::Ultra),
            _ => Err(format!("Unknown shadow quality: {}", s)),
        }
    }
}

impl ShadowQuality {
    /// Convert to a ShadowSettings
    pub fn to_settings(self) -> ShadowSettings {
        match self {
            Self::Low => ShadowSettings::low_quality(),
            Self::Medium => ShadowSettings::default(),
            Self::High => ShadowSettings::high_quality(),
            Self::Ultra => ShadowSettings {
                max_distance: 200.0,
                directional: DirectionalShadowSettings {
                    atlas_size: 8192,
                    filter: FilterMode::Pcf7x7,
                    cascade_count: 4,
                    cascade_ratios: [0.05, 0.15, 0.4],
                    cascade_fade: 0.2,
                    cascade_blend: CascadeBlendMode::Dither,
                },
                ..Default::default()
            },
        }
    }
}

#[inline]
fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_settings_default() {
        let settings = ShadowSettings::default();
        assert_eq!(settings.directional.atlas_size, 1024);
        assert_eq!(settings.directional.cascade_count, 4);
        assert!(settings.check().is_ok());
    }

    #[test]
    fn test_shadow_settings_validate() {
        let mut settings = ShadowSettings {
            max_distance: -5.0,
            directional: DirectionalShadowSettings {
                atlas_size: 1000,               // Not power of 2
                cascade_count: 10,              // Too high
                cascade_ratios: [0.5, 0.2, 1.5], // Decreasing and out of range
                cascade_fade: 2.0,
                ..Default::default()
            },
            ..Default::default()
        };

        settings.validate();

        assert_eq!(settings.directional.atlas_size, 1024);
        assert_eq!(settings.directional.cascade_count, 4);
        assert_eq!(settings.directional.cascade_ratios, [0.5, 0.5, 1.0]);
        assert_eq!(settings.directional.cascade_fade, 1.0);
        assert!(settings.max_distance > 0.0);
        assert!(settings.check().is_ok());
    }

    #[test]
    fn test_validate_nan() {
        let mut settings = ShadowSettings {
            max_distance: f32::NAN,
            distance_fade: f32::INFINITY,
            directional: DirectionalShadowSettings {
                cascade_ratios: [f32::NAN, 0.2, f32::NAN],
                cascade_fade: f32::NAN,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.check().is_err());

        settings.validate();

        assert_eq!(settings.max_distance, 100.0);
        assert_eq!(settings.distance_fade, 0.1);
        assert_eq!(settings.directional.cascade_fade, 0.1);
        assert_eq!(settings.directional.cascade_ratios, [0.0, 0.2, 0.2]);
        assert!(settings.check().is_ok());
    }

    #[test]
    fn test_check_rejects_decreasing_ratios() {
        let mut settings = ShadowSettings::default();
        settings.directional.cascade_ratios = [0.4, 0.3, 0.5];
        assert!(matches!(settings.check(), Err(ConfigError::CascadeRatios(_))));
    }

    #[test]
    fn test_check_rejects_cascade_count() {
        let mut settings = ShadowSettings::default();
        settings.directional.cascade_count = 0;
        assert!(matches!(
            settings.check(),
            Err(ConfigError::CascadeCount { count: 0, max: 4 })
        ));
    }

    #[test]
    fn test_blend_culling_factor() {
        let mut dir = DirectionalShadowSettings::default();
        dir.cascade_fade = 0.1;
        assert!((dir.blend_culling_factor() - 0.7).abs() < 1e-6);
        dir.cascade_fade = 0.95;
        assert_eq!(dir.blend_culling_factor(), 0.0);
    }

    #[test]
    fn test_filter_keywords() {
        assert_eq!(FilterMode::Pcf2x2.keyword_index(), None);
        assert_eq!(FilterMode::Pcf3x3.keyword_index(), Some(0));
        assert_eq!(FilterMode::Pcf7x7.keyword_index(), Some(2));
        assert_eq!(FilterMode::Pcf5x5.ordinal(), 2);
        assert_eq!(CascadeBlendMode::Dither.keyword_index(), Some(1));
    }

    #[test]
    fn test_settings_json_roundtrip() {
        let settings = ShadowSettings::high_quality();
        let json = serde_json::to_string(&settings).unwrap();
        let restored = ShadowSettings::from_json_str(&json).unwrap();
        assert_eq!(restored, settings);
    }

    #[test]
    fn test_settings_toml_partial() {
        let text = r#"
            max_distance = 80.0

            [directional]
            atlas_size = 2000
            filter = "Pcf5x5"
            cascade_count = 2
        "#;
        let settings = ShadowSettings::from_toml_str(text).unwrap();
        assert_eq!(settings.max_distance, 80.0);
        assert_eq!(settings.directional.atlas_size, 2048);
        assert_eq!(settings.directional.filter, FilterMode::Pcf5x5);
        assert_eq!(settings.directional.cascade_count, 2);
        // Unspecified fields keep defaults
        assert_eq!(settings.directional.cascade_ratios, [0.1, 0.25, 0.5]);
    }

    #[test]
    fn test_settings_json_rejects_bad_fade() {
        let json = r#"{ "directional": { "cascade_fade": 1.5 } }"#;
        assert!(matches!(
            ShadowSettings::from_json_str(json),
            Err(ConfigError::CascadeFade(_))
        ));
    }

    #[test]
    fn test_quality_from_str() {
        assert_eq!("HIGH".parse::<ShadowQuality>(), Ok(ShadowQuality::High));
        assert_eq!("default".parse::<ShadowQuality>(), Ok(ShadowQuality::Medium));
        assert!("extreme".parse::<ShadowQuality>().is_err());
        assert_eq!(ShadowQuality::Ultra.to_string(), "ultra");
    }

    #[test]
    fn test_quality_presets() {
        let ultra = ShadowQuality::Ultra.to_settings();
        assert_eq!(ultra.directional.filter, FilterMode::Pcf7x7);
        assert!(ultra.check().is_ok());
        assert!(ShadowQuality::Low.to_settings().check().is_ok());
        assert!(ShadowQuality::High.to_settings().check().is_ok());
    }
}
