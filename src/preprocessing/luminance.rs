//! Perceptual luminance shared by content detection and thresholding.

use image::Rgba;

const RED_WEIGHT: f64 = 0.299;
const GREEN_WEIGHT: f64 = 0.587;
const BLUE_WEIGHT: f64 = 0.114;

/// Weighted luminance `0.299r + 0.587g + 0.114b`, alpha ignored.
#[inline]
pub fn luminance(pixel: &Rgba<u8>) -> f64 {
    RED_WEIGHT * pixel[0] as f64 + GREEN_WEIGHT * pixel[1] as f64 + BLUE_WEIGHT * pixel[2] as f64
}

/// Luminance rounded to the nearest integer and clamped to a histogram bucket.
#[inline]
pub fn luminance_u8(pixel: &Rgba<u8>) -> u8 {
    luminance(pixel).round().clamp(0.0, 255.0) as u8
}
