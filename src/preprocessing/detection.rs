//! # Content Detection
//!
//! Finds the extent of non-background pixels so the crop tool can start from
//! a tight box around the document instead of the full photo.

use image::RgbaImage;

use super::geometry::CropRegion;
use super::luminance::luminance;
use super::types::PixelRect;
use crate::config::DetectionConfig;

/// Bounding box of the content pixels found in a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedContent {
    /// Padded box in normalized coordinates
    pub region: CropRegion,
    /// Unpadded content extent in pixels (inclusive of the last pixel)
    pub content_bounds: PixelRect,
    /// Padding added on every side, in pixels
    pub padding: f64,
}

/// Scans every pixel and returns the padded box around all pixels darker
/// than `config.content_luminance_cutoff`.
///
/// The padding is `min(max_padding_px, box_width * padding_ratio)` pixels,
/// where `box_width` counts both the first and last content column. The padded
/// box is clamped to the image before normalizing. Returns `None` for an
/// empty raster or one with no content pixel at all.
pub fn detect_content_bounds(raster: &RgbaImage, config: &DetectionConfig) -> Option<DetectedContent> {
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in raster.enumerate_pixels() {
        if luminance(pixel) < config.content_luminance_cutoff {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return None;
    }

    let box_width = (max_x - min_x + 1) as f64;
    let padding = config.max_padding_px.min(box_width * config.padding_ratio);

    let w = width as f64;
    let h = height as f64;
    let left = (min_x as f64 - padding).max(0.0);
    let top = (min_y as f64 - padding).max(0.0);
    let right = ((max_x + 1) as f64 + padding).min(w);
    let bottom = ((max_y + 1) as f64 + padding).min(h);

    Some(DetectedContent {
        region: CropRegion::new(left / w, top / h, (right - left) / w, (bottom - top) / h),
        content_bounds: PixelRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        },
        padding,
    })
}
