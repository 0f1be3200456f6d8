//! # Image Preprocessing Module
//!
//! This module prepares rasters for OCR: interactive crop geometry, content
//! auto-detection, crop extraction and Otsu binarization.
//!
//! The module is organized into focused sub-modules:
//! - `geometry`: Normalized crop regions, resize handles and aspect reprojection
//! - `aspect`: Aspect ratio presets and ratio parsing
//! - `viewport`: Display-fit scaling and pointer conversion
//! - `cropping`: The per-image crop engine and crop extraction
//! - `detection`: Content bounding box detection
//! - `thresholding`: Binary thresholding using Otsu's method
//! - `luminance`: Shared luminance formula
//! - `types`: Shared types and error definitions

pub mod aspect;
pub mod cropping;
pub mod detection;
pub mod geometry;
pub mod luminance;
pub mod thresholding;
pub mod types;
pub mod viewport;

// Re-export commonly used types and functions for convenience
pub use aspect::AspectPreset;
pub use cropping::{materialize_crop, pixel_rect, CropGeometryEngine, DragState};
pub use detection::{detect_content_bounds, DetectedContent};
pub use geometry::{
    apply_delta, clamp_to_bounds, reproject_aspect_ratio, AnchoredEdges, CropRegion, Handle,
    NormalizedPoint, MIN_REGION_SIZE,
};
pub use thresholding::{binarize, find_otsu_threshold, otsu_split, LuminanceHistogram};
pub use types::{CroppedImageResult, PixelRect, PreprocessingError, ThresholdedImageResult};
pub use viewport::DisplayViewport;
