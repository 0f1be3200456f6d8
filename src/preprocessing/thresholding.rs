//! # Image Thresholding Module
//!
//! This module provides binary thresholding functionality for OCR preprocessing.
//! It includes Otsu's method for automatic threshold selection.

use std::time::Instant;

use image::{Rgba, RgbaImage};

use super::luminance::luminance_u8;
use super::types::{PreprocessingError, ThresholdedImageResult};
use crate::observability;

/// 256-bucket luminance histogram plus the per-pixel values it was built from.
///
/// Keeping the rounded luminance of every pixel lets the classification pass
/// reuse exactly the values that were counted.
#[derive(Debug, Clone)]
pub struct LuminanceHistogram {
    pub buckets: [u64; 256],
    pub luminances: Vec<u8>,
}

impl LuminanceHistogram {
    pub fn from_raster(raster: &RgbaImage) -> Self {
        let mut buckets = [0u64; 256];
        let mut luminances = Vec::with_capacity(raster.width() as usize * raster.height() as usize);

        for pixel in raster.pixels() {
            let value = luminance_u8(pixel);
            buckets[value as usize] += 1;
            luminances.push(value);
        }

        Self { buckets, luminances }
    }

    pub fn total_pixels(&self) -> u64 {
        self.luminances.len() as u64
    }
}

/// Converts a raster to pure black and white using Otsu's threshold.
///
/// Pixels whose rounded luminance is below the threshold become `(0, 0, 0)`,
/// the rest `(255, 255, 255)`; alpha is copied unchanged. The input is never
/// modified. A uniform image has no valid split, gets threshold 0 and comes
/// out all white.
///
/// # Errors
///
/// Returns `PreprocessingError::EmptyImage` for a zero-pixel raster.
///
/// # Examples
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use ocr_prep::preprocessing::binarize;
///
/// let img = RgbaImage::from_fn(4, 1, |x, _| if x < 2 { Rgba([10, 10, 10, 255]) } else { Rgba([250, 250, 250, 255]) });
/// let result = binarize(&img).unwrap();
/// assert_eq!(result.image.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
/// assert_eq!(result.image.get_pixel(3, 0), &Rgba([255, 255, 255, 255]));
/// ```
pub fn binarize(raster: &RgbaImage) -> Result<ThresholdedImageResult, PreprocessingError> {
    let start_time = Instant::now();

    if raster.width() == 0 || raster.height() == 0 {
        return Err(PreprocessingError::EmptyImage);
    }

    let histogram = LuminanceHistogram::from_raster(raster);
    let threshold = find_otsu_threshold(&histogram.buckets, histogram.total_pixels());

    let mut binary_img = RgbaImage::new(raster.width(), raster.height());
    for ((source, target), &value) in raster
        .pixels()
        .zip(binary_img.pixels_mut())
        .zip(histogram.luminances.iter())
    {
        let level = if value < threshold { 0u8 } else { 255u8 };
        *target = Rgba([level, level, level, source[3]]);
    }

    let processing_time = start_time.elapsed();
    observability::record_binarize_metrics(threshold, histogram.total_pixels(), processing_time);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Otsu thresholding completed in {:.2}ms: threshold={}, dimensions={}x{}",
        processing_time.as_secs_f64() * 1000.0,
        threshold,
        raster.width(),
        raster.height()
    );

    Ok(ThresholdedImageResult {
        image: binary_img,
        threshold,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Best background/foreground split by between-class variance.
///
/// Returns the highest luminance `t` of the background class (pixels `<= t`)
/// and its variance, or `None` when no split has positive variance. Ties keep
/// the lowest `t`.
pub fn otsu_split(histogram: &[u64; 256], total_pixels: u64) -> Option<(u8, f64)> {
    let total = total_pixels as f64;
    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(t, &count)| t as f64 * count as f64)
        .sum();

    let mut weight_background = 0f64;
    let mut sum_background = 0f64;
    let mut max_variance = 0f64;
    let mut best: Option<u8> = None;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }

        let weight_foreground = total - weight_background;
        if weight_foreground <= 0.0 {
            break;
        }

        sum_background += t as f64 * count as f64;

        let mean_background = sum_background / weight_background;
        let mean_foreground = (weighted_sum - sum_background) / weight_foreground;
        let diff = mean_background - mean_foreground;
        let variance = weight_background * weight_foreground * diff * diff;

        // Strict comparison: the first maximum wins
        if variance > max_variance {
            max_variance = variance;
            best = Some(t as u8);
        }
    }

    best.map(|t| (t, max_variance))
}

/// Finds the luminance at which pixels start being classified as white.
///
/// This is one past the background class found by [`otsu_split`], so that
/// `luminance < threshold` selects exactly the background. Returns 0 when the
/// histogram has no valid split (empty or single-valued).
pub fn find_otsu_threshold(histogram: &[u64; 256], total_pixels: u64) -> u8 {
    match otsu_split(histogram, total_pixels) {
        // t <= 254 because a split needs pixels above t
        Some((t, _)) => t.saturating_add(1),
        None => 0,
    }
}
