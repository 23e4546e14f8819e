//! Configuration
//!
//! All sections default sensibly, so an empty file (or no file) is a valid
//! configuration. Values are checked by [`Config::validate`] after loading.

use std::path::Path;

use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::projection::Plane;

/// Dots per centimeter of a 96 DPI display.
pub const DEFAULT_DOTS_PER_CM: f32 = 96.0 / 2.54;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings shared by every gesture
    pub gesture: GestureConfig,
    pub scale: ScaleConfig,
    pub rotate: RotateConfig,
    pub pan: PanConfig,
    pub transformer: TransformerConfig,
    /// Remote touch source settings
    pub input: InputConfig,
}

/// Settings shared by every gesture instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Screen density used to turn centimeters into pixels
    pub dots_per_cm: f32,
    /// Two-point frames closer than this (cm) are ignored
    pub min_points_distance_cm: f32,
    /// Plane touches are projected onto
    pub transform_plane: PlaneConfig,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            dots_per_cm: DEFAULT_DOTS_PER_CM,
            min_points_distance_cm: 0.5,
            transform_plane: PlaneConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneConfig {
    pub point: [f32; 3],
    pub normal: [f32; 3],
}

impl PlaneConfig {
    /// Build the plane. A zero normal falls back to +z; `validate` rejects it
    /// before this is reached for loaded configurations.
    pub fn to_plane(&self) -> Plane {
        let point = Point3::from(self.point);
        Plane::from_normal(point, Vector3::from(self.normal))
            .unwrap_or_else(|| Plane::new(point, Vector3::z_axis()))
    }
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            point: [0.0, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Distance (cm) the points must spread or pinch before scaling begins
    pub threshold_cm: f32,
    pub min_scale: [f32; 2],
    pub max_scale: [f32; 2],
}

impl ScaleConfig {
    pub fn min_scale(&self) -> Vector2<f32> {
        Vector2::from(self.min_scale)
    }

    pub fn max_scale(&self) -> Vector2<f32> {
        Vector2::from(self.max_scale)
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            threshold_cm: 0.5,
            min_scale: [1.0, 1.0],
            max_scale: [10.0, 10.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateConfig {
    /// Angle the points must turn before rotation begins
    pub threshold_degrees: f32,
}

impl Default for RotateConfig {
    fn default() -> Self {
        Self {
            threshold_degrees: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanConfig {
    /// Distance (cm) the center must travel before panning begins
    pub movement_threshold_cm: f32,
}

impl Default for PanConfig {
    fn default() -> Self {
        Self {
            movement_threshold_cm: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Fraction of the remaining distance covered per second
    pub speed: f32,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self { speed: 10.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Remote moves shorter than this (cm) are dropped
    pub movement_threshold_cm: f32,
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let gesture = &self.gesture;
        if !(gesture.dots_per_cm > 0.0) {
            return Err(Error::invalid(
                "gesture.dots_per_cm",
                format!("must be > 0, got {}", gesture.dots_per_cm),
            ));
        }
        non_negative("gesture.min_points_distance_cm", gesture.min_points_distance_cm)?;
        if Vector3::from(gesture.transform_plane.normal).norm() <= f32::EPSILON {
            return Err(Error::invalid("gesture.transform_plane.normal", "must be non-zero"));
        }

        non_negative("scale.threshold_cm", self.scale.threshold_cm)?;
        let (min, max) = (self.scale.min_scale(), self.scale.max_scale());
        if min.iter().any(|c| !(*c > 0.0)) {
            return Err(Error::invalid(
                "scale.min_scale",
                format!("components must be > 0, got [{}, {}]", min.x, min.y),
            ));
        }
        if max.x < min.x || max.y < min.y {
            return Err(Error::invalid(
                "scale.max_scale",
                format!("must be >= min_scale, got [{}, {}]", max.x, max.y),
            ));
        }

        non_negative("rotate.threshold_degrees", self.rotate.threshold_degrees)?;
        non_negative("pan.movement_threshold_cm", self.pan.movement_threshold_cm)?;
        non_negative("input.movement_threshold_cm", self.input.movement_threshold_cm)?;

        if !(self.transformer.speed > 0.0) {
            return Err(Error::invalid(
                "transformer.speed",
                format!("must be > 0, got {}", self.transformer.speed),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::invalid("config", e.to_string()))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(field, format!("must be >= 0, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scale.min_scale, [1.0, 1.0]);
        assert_eq!(config.transformer.speed, 10.0);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_document() {
        let config = Config::from_toml_str(
            r#"
            [gesture]
            dots_per_cm = 2.0

            [scale]
            max_scale = [4.0, 4.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.gesture.dots_per_cm, 2.0);
        assert_eq!(config.gesture.min_points_distance_cm, 0.5);
        assert_eq!(config.scale.max_scale, [4.0, 4.0]);
        assert_eq!(config.scale.threshold_cm, 0.5);
    }

    #[test]
    fn test_config_serialization() {
        let toml = Config::default().to_toml().unwrap();
        assert!(toml.contains("[gesture]"));
        assert!(toml.contains("[scale]"));
        assert!(toml.contains("[transformer]"));
        assert_eq!(Config::from_toml_str(&toml).unwrap(), Config::default());
    }

    #[test]
    fn test_rejects_inverted_scale_bounds() {
        let err = Config::from_toml_str("[scale]\nmin_scale = [2.0, 2.0]\nmax_scale = [1.0, 3.0]\n")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "scale.max_scale", .. }));
    }

    #[test]
    fn test_rejects_zero_density() {
        let mut config = Config::default();
        config.gesture.dots_per_cm = 0.0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { field: "gesture.dots_per_cm", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_normal() {
        let mut config = Config::default();
        config.gesture.transform_plane.normal = [0.0, 0.0, 0.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let mut config = Config::default();
        config.rotate.threshold_degrees = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_document() {
        let err = Config::from_toml_str("[scale\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/pinch/config.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
