//! # Shared Types for Image Preprocessing
//!
//! This module contains the error type and result structs shared across
//! the preprocessing sub-modules.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::geometry::CropRegion;

/// Errors that can occur during image preprocessing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    /// Crop rectangle rounds to zero width or height in natural pixels
    InvalidRegion { width: u32, height: u32 },
    /// Zero-pixel raster passed to the binarizer
    EmptyImage,
    /// Failed to load or decode image
    ImageLoad { message: String },
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::InvalidRegion { width, height } => {
                write!(
                    f,
                    "Invalid crop region: {}x{} pixels. Width and height must be at least 1",
                    width, height
                )
            }
            PreprocessingError::EmptyImage => {
                write!(f, "Cannot binarize an image with zero pixels")
            }
            PreprocessingError::ImageLoad { message } => {
                write!(f, "Failed to load image: {}", message)
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Result of image thresholding operation.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The binarized RGBA image (alpha preserved)
    pub image: RgbaImage,
    /// Luminance at which pixels start turning white
    pub threshold: u8,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Natural-pixel rectangle extracted by a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of image cropping operation.
#[derive(Debug, Clone)]
pub struct CroppedImageResult {
    /// The cropped image
    pub image: RgbaImage,
    /// Normalized region the crop was taken from
    pub region: CropRegion,
    /// Cropped region in natural pixel coordinates
    pub pixel_rect: PixelRect,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
