//! # OCR Prep
//!
//! Image preparation ahead of OCR: an interactive crop geometry engine that
//! keeps a normalized crop region valid under drags, aspect constraints and
//! content auto-detection, plus Otsu binarization of the cropped raster.

pub mod config;
pub mod errors;
pub mod observability;
pub mod observability_config;
pub mod pipeline;
pub mod preprocessing;

// Re-export types for easier access
pub use config::PrepConfig;
pub use errors::{AppError, AppResult};
pub use pipeline::{prepare_file, prepare_image, prepare_pages, PageRange, PrepOptions};
pub use preprocessing::{binarize, CropGeometryEngine, CropRegion, Handle, NormalizedPoint};
