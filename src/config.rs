//! # Unified Application Configuration
//!
//! This module consolidates the preprocessing settings into a single,
//! structured configuration object. It supports loading from environment
//! variables and validation before any image is touched.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Interactive crop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropConfig {
    /// Smallest width/height (fraction of the image) a resize handle may leave
    pub min_size: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self { min_size: 0.01 } // 1% of the image
    }
}

impl CropConfig {
    /// Validate crop configuration
    pub fn validate(&self) -> AppResult<()> {
        if !(self.min_size > 0.0 && self.min_size <= 0.5) {
            return Err(AppError::Config(format!(
                "Crop minimum size must be in (0, 0.5], got {}",
                self.min_size
            )));
        }
        Ok(())
    }
}

/// Content auto-detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Pixels with luminance below this value count as content
    pub content_luminance_cutoff: f64,
    /// Upper bound on the padding added around detected content, in pixels
    pub max_padding_px: f64,
    /// Padding as a fraction of the detected box width
    pub padding_ratio: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            content_luminance_cutoff: 240.0,
            max_padding_px: 20.0,
            padding_ratio: 0.05,
        }
    }
}

impl DetectionConfig {
    /// Validate detection configuration
    pub fn validate(&self) -> AppResult<()> {
        if !(self.content_luminance_cutoff > 0.0 && self.content_luminance_cutoff <= 255.0) {
            return Err(AppError::Config(format!(
                "Content luminance cutoff must be in (0, 255], got {}",
                self.content_luminance_cutoff
            )));
        }

        if self.max_padding_px.is_nan() || self.max_padding_px < 0.0 {
            return Err(AppError::Config(
                "Maximum detection padding cannot be negative".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.padding_ratio) {
            return Err(AppError::Config(format!(
                "Detection padding ratio must be in [0, 1], got {}",
                self.padding_ratio
            )));
        }

        Ok(())
    }
}

/// Pipeline settings for single images and page batches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of pages prepared at the same time
    pub max_concurrent_pages: usize,
    /// Whether binarization runs when the caller does not choose
    pub binarize_by_default: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages: 4,
            binarize_by_default: false,
        }
    }
}

impl PipelineConfig {
    /// Validate pipeline configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_pages == 0 {
            return Err(AppError::Config(
                "Max concurrent pages cannot be 0".to_string(),
            ));
        }

        if self.max_concurrent_pages > 64 {
            return Err(AppError::Config(
                "Max concurrent pages cannot be greater than 64".to_string(),
            ));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct PrepConfig {
    /// Crop engine configuration
    pub crop: CropConfig,
    /// Auto-detection configuration
    pub detection: DetectionConfig,
    /// Pipeline configuration
    pub pipeline: PipelineConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl PrepConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        config.crop.min_size = env_or("CROP_MIN_SIZE", config.crop.min_size)?;

        config.detection.content_luminance_cutoff =
            env_or("DETECT_LUMINANCE_CUTOFF", config.detection.content_luminance_cutoff)?;
        config.detection.max_padding_px =
            env_or("DETECT_MAX_PADDING_PX", config.detection.max_padding_px)?;
        config.detection.padding_ratio =
            env_or("DETECT_PADDING_RATIO", config.detection.padding_ratio)?;

        config.pipeline.max_concurrent_pages =
            env_or("MAX_CONCURRENT_PAGES", config.pipeline.max_concurrent_pages)?;
        config.pipeline.binarize_by_default = env::var("BINARIZE_BY_DEFAULT")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.crop.validate()?;
        self.detection.validate()?;
        self.pipeline.validate()?;
        self.observability
            .validate()
            .map_err(AppError::Config)?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: crop_min_size={}, luminance_cutoff={}, max_padding_px={}, padding_ratio={}, max_concurrent_pages={}, binarize_by_default={}",
            self.crop.min_size,
            self.detection.content_luminance_cutoff,
            self.detection.max_padding_px,
            self.detection.padding_ratio,
            self.pipeline.max_concurrent_pages,
            self.pipeline.binarize_by_default
        )
    }
}

/// Reads `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
