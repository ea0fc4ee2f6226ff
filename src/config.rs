//! Configuration for the capture and compression pipeline.
//!
//! The quality factors and dimension bounds here are part of the delivery
//! contract; changing them changes the artifacts the rest of the system
//! stores. Defaults match the deployed values.

use crate::host::ResolutionHint;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Session-level settings: zoom policy and resolution hints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fixed per-session zoom ceiling.
    pub max_zoom: f32,
    /// Zoom increment applied by `zoom_in`/`zoom_out`.
    pub zoom_step: f32,
    /// Resolution preferences for the ideal acquisition attempt.
    pub resolution: ResolutionHint,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_zoom: 4.0,
            zoom_step: 0.5,
            resolution: ResolutionHint::default(),
        }
    }
}

/// Capture-engine settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Maximum captured dimension on either axis.
    pub max_dimension: u32,
    /// JPEG quality of the preview encoding (quality evaluation input).
    pub preview_quality: f32,
    /// JPEG quality of the delivery encoding (compression input).
    pub delivery_quality: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            preview_quality: 0.8,
            delivery_quality: 0.6,
        }
    }
}

/// Configuration validation and loading errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Zoom settings out of range.
    #[error("invalid zoom settings: {0}")]
    InvalidZoom(&'static str),
    /// A quality factor outside `(0, 1]`.
    #[error("invalid quality factor: {0}")]
    InvalidQuality(&'static str),
    /// A zero dimension or size bound.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(&'static str),
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file could not be parsed.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

fn check_quality(value: f32, what: &'static str) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidQuality(what))
    }
}

impl SessionConfig {
    /// Validates the zoom policy and resolution hints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_zoom < 1.0 {
            return Err(ConfigError::InvalidZoom("max_zoom must be at least 1.0"));
        }
        if self.zoom_step <= 0.0 {
            return Err(ConfigError::InvalidZoom("zoom_step must be positive"));
        }
        let r = &self.resolution;
        if r.ideal_width == 0 || r.ideal_height == 0 || r.max_width == 0 || r.max_height == 0 {
            return Err(ConfigError::InvalidDimensions(
                "resolution hints must be non-zero",
            ));
        }
        Ok(())
    }
}

impl CaptureConfig {
    /// Validates dimensions and quality factors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::InvalidDimensions(
                "max_dimension must be non-zero",
            ));
        }
        check_quality(self.preview_quality, "preview_quality must be in (0, 1]")?;
        check_quality(self.delivery_quality, "delivery_quality must be in (0, 1]")?;
        Ok(())
    }
}

impl crate::compress::CompressionConfig {
    /// Validates dimensions, the oversize limit and the second-pass quality.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::InvalidDimensions(
                "max_dimension must be non-zero",
            ));
        }
        if self.oversize_limit_bytes == 0 {
            return Err(ConfigError::InvalidDimensions(
                "oversize_limit_bytes must be non-zero",
            ));
        }
        check_quality(
            self.second_pass_quality,
            "second_pass_quality must be in (0, 1]",
        )
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[session]` section.
    #[serde(default)]
    pub session: SessionConfig,
    /// `[capture]` section.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// `[compression]` section.
    #[serde(default)]
    pub compression: crate::compress::CompressionConfig,
}

impl FileConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.capture.validate()?;
        self.compression.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zoom_bounds_rejected() {
        let mut config = SessionConfig::default();
        config.max_zoom = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidZoom(_))
        ));

        let mut config = SessionConfig::default();
        config.zoom_step = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        let mut config = CaptureConfig::default();
        config.preview_quality = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuality(_))
        ));

        let mut config = CaptureConfig::default();
        config.delivery_quality = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: FileConfig = toml::from_str(
            r#"
            [session]
            max_zoom = 6.0
            zoom_step = 0.5

            [session.resolution]
            ideal_width = 1280
            ideal_height = 720
            max_width = 1920
            max_height = 1080
            "#,
        )
        .unwrap();
        assert_eq!(parsed.session.max_zoom, 6.0);
        assert_eq!(parsed.capture.max_dimension, 800);
        assert_eq!(parsed.compression.second_pass_quality, 0.4);
    }
}
