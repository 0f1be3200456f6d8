//! # Image Cropping Module
//!
//! This module holds the interactive crop state for one image and turns the
//! final normalized region into a natural-resolution raster.
//!
//! A gesture is always `begin_drag` → `update_drag`* → `end_drag`. Every
//! transition leaves the region inside the image, with the aspect ratio
//! constraint (if any) reapplied.

use std::time::Instant;

use image::RgbaImage;

use super::detection::detect_content_bounds;
use super::geometry::{
    apply_delta, clamp_to_bounds, reproject_aspect_ratio, AnchoredEdges, CropRegion, Handle,
    NormalizedPoint, MIN_REGION_SIZE,
};
use super::types::{CroppedImageResult, PixelRect, PreprocessingError};
use crate::config::{CropConfig, DetectionConfig};
use crate::observability;

/// An in-progress pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub handle: Handle,
    /// Press position for `Move`; last pointer position for resize handles
    pub anchor: NormalizedPoint,
}

/// Crop state for a single image session.
#[derive(Debug, Clone)]
pub struct CropGeometryEngine {
    natural_width: u32,
    natural_height: u32,
    region: CropRegion,
    aspect_ratio: Option<f64>,
    drag: Option<DragState>,
    min_size: f64,
}

impl CropGeometryEngine {
    /// Creates an engine covering the whole image.
    pub fn new(natural_width: u32, natural_height: u32) -> Self {
        Self {
            natural_width,
            natural_height,
            region: CropRegion::FULL,
            aspect_ratio: None,
            drag: None,
            min_size: MIN_REGION_SIZE,
        }
    }

    pub fn with_config(natural_width: u32, natural_height: u32, config: &CropConfig) -> Self {
        Self {
            min_size: config.min_size,
            ..Self::new(natural_width, natural_height)
        }
    }

    pub fn region(&self) -> CropRegion {
        self.region
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        self.aspect_ratio
    }

    pub fn natural_size(&self) -> (u32, u32) {
        (self.natural_width, self.natural_height)
    }

    pub fn drag_state(&self) -> Option<DragState> {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Starts over for a newly loaded image: full region, no constraint, no gesture.
    pub fn reset(&mut self, natural_width: u32, natural_height: u32) {
        self.natural_width = natural_width;
        self.natural_height = natural_height;
        self.region = CropRegion::FULL;
        self.aspect_ratio = None;
        self.drag = None;
    }

    /// Abandons the crop for the current image.
    pub fn cancel(&mut self) {
        self.reset(self.natural_width, self.natural_height);
    }

    pub fn begin_drag(&mut self, handle: Handle, pointer: NormalizedPoint) {
        self.drag = Some(DragState {
            handle,
            anchor: pointer.clamped(),
        });
    }

    /// Applies the pointer move to the active gesture and returns the new region.
    ///
    /// Without an active gesture this is a no-op.
    pub fn update_drag(&mut self, pointer: NormalizedPoint) -> CropRegion {
        let Some(drag) = self.drag else {
            return self.region;
        };
        let pointer = pointer.clamped();

        let (candidate, anchored) = match drag.handle {
            Handle::Move => (
                CropRegion::from_corners(drag.anchor, pointer),
                AnchoredEdges {
                    right: pointer.x < drag.anchor.x,
                    bottom: pointer.y < drag.anchor.y,
                },
            ),
            handle => {
                let dx = pointer.x - drag.anchor.x;
                let dy = pointer.y - drag.anchor.y;
                self.drag = Some(DragState {
                    handle,
                    anchor: pointer,
                });
                (
                    apply_delta(self.region, handle, dx, dy, self.min_size),
                    handle.anchored_edges(),
                )
            }
        };

        self.region = self.constrain(candidate, anchored);
        self.region
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Sets or clears the width-to-height constraint and reprojects the region.
    ///
    /// Non-positive or non-finite ratios clear the constraint.
    pub fn apply_aspect_ratio(&mut self, ratio: Option<f64>) {
        self.aspect_ratio = ratio.filter(|r| r.is_finite() && *r > 0.0);
        if ratio.is_some() && self.aspect_ratio.is_none() {
            tracing::warn!(ratio = ?ratio, "Ignoring invalid aspect ratio, constraint cleared");
        }
        self.region = self.constrain(self.region, AnchoredEdges::default());
    }

    /// Replaces the region, e.g. with one restored from a previous session.
    pub fn set_region(&mut self, region: CropRegion) {
        self.region = self.constrain(region, AnchoredEdges::default());
    }

    /// Moves the region onto the detected content of `raster`.
    ///
    /// Returns the new region, or `None` (region unchanged) when the raster
    /// has no content pixels.
    pub fn auto_detect_content(&mut self, raster: &RgbaImage, config: &DetectionConfig) -> Option<CropRegion> {
        let start_time = Instant::now();
        let detected = detect_content_bounds(raster, config);
        observability::record_auto_detect(detected.is_some(), start_time.elapsed());

        match detected {
            Some(content) => {
                self.region = self.constrain(content.region, AnchoredEdges::default());
                tracing::debug!(
                    target: "ocr_preprocessing",
                    "Detected content {:?} with {:.1}px padding in {}x{} image, region {}",
                    content.content_bounds,
                    content.padding,
                    raster.width(),
                    raster.height(),
                    self.region
                );
                Some(self.region)
            }
            None => {
                tracing::warn!(
                    width = raster.width(),
                    height = raster.height(),
                    "Auto-detect found no content, keeping current crop region"
                );
                None
            }
        }
    }

    /// Natural-pixel rectangle the current region covers.
    pub fn crop_rect_pixels(&self) -> PixelRect {
        pixel_rect(&self.region, self.natural_width, self.natural_height)
    }

    /// Extracts the current region from the natural-resolution source.
    pub fn materialize(&self, source: &RgbaImage) -> Result<CroppedImageResult, PreprocessingError> {
        if source.dimensions() != (self.natural_width, self.natural_height) {
            tracing::debug!(
                target: "ocr_preprocessing",
                "Source is {}x{} but session was opened at {}x{}, cropping by source size",
                source.width(),
                source.height(),
                self.natural_width,
                self.natural_height
            );
        }
        materialize_crop(source, &self.region)
    }

    fn constrain(&self, candidate: CropRegion, anchored: AnchoredEdges) -> CropRegion {
        let mut region = clamp_to_bounds(candidate);
        if let Some(ratio) = self.aspect_ratio {
            region = reproject_aspect_ratio(region, ratio, self.natural_width, self.natural_height, anchored);
            region = clamp_to_bounds(region);
        }
        region
    }
}

/// Rounds a normalized region to natural pixels, trimmed to the image.
pub fn pixel_rect(region: &CropRegion, natural_width: u32, natural_height: u32) -> PixelRect {
    let nw = natural_width as f64;
    let nh = natural_height as f64;
    let x = ((region.x * nw).round().max(0.0) as u32).min(natural_width);
    let y = ((region.y * nh).round().max(0.0) as u32).min(natural_height);
    let width = ((region.width * nw).round().max(0.0) as u32).min(natural_width - x);
    let height = ((region.height * nh).round().max(0.0) as u32).min(natural_height - y);
    PixelRect { x, y, width, height }
}

/// Copies `region` out of `source` into a new raster.
///
/// The output is `round(width*W) x round(height*H)` pixels starting at
/// `(round(x*W), round(y*H))`, trimmed if rounding would run past the right
/// or bottom edge. Fails with `InvalidRegion` when either side is zero.
pub fn materialize_crop(source: &RgbaImage, region: &CropRegion) -> Result<CroppedImageResult, PreprocessingError> {
    let start_time = Instant::now();
    let rect = pixel_rect(region, source.width(), source.height());

    if rect.width == 0 || rect.height == 0 {
        observability::record_crop_metrics(false, start_time.elapsed());
        return Err(PreprocessingError::InvalidRegion {
            width: rect.width,
            height: rect.height,
        });
    }

    let cropped = image::imageops::crop_imm(source, rect.x, rect.y, rect.width, rect.height).to_image();
    let processing_time = start_time.elapsed();
    observability::record_crop_metrics(true, processing_time);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Cropped {}x{} image to {:?} (region {}) in {:.2}ms",
        source.width(),
        source.height(),
        rect,
        region,
        processing_time.as_secs_f64() * 1000.0
    );

    Ok(CroppedImageResult {
        image: cropped,
        region: *region,
        pixel_rect: rect,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}
