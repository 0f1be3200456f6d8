//! # Preparation Pipeline
//!
//! Runs the crop and binarization steps the way the upload flow does before
//! handing a raster to OCR: one image at a time, or a range of rendered
//! document pages prepared concurrently.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PrepConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::preprocessing::{
    binarize, AspectPreset, CropGeometryEngine, CropRegion, PixelRect, PreprocessingError,
};

/// What to do with each image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrepOptions {
    /// Explicit crop region; takes precedence over auto-detection
    pub region: Option<CropRegion>,
    /// Aspect constraint applied to whichever region is used
    pub aspect: AspectPreset,
    /// Seed the region from detected content
    pub auto_detect: bool,
    /// Run Otsu binarization on the cropped raster
    pub binarize: bool,
}

impl PrepOptions {
    /// Options with the configured binarization default and no crop.
    pub fn from_config(config: &PrepConfig) -> Self {
        Self {
            binarize: config.pipeline.binarize_by_default,
            ..Default::default()
        }
    }
}

/// Summary of how one image was prepared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based page number for batch runs
    pub page: Option<u32>,
    pub source_width: u32,
    pub source_height: u32,
    pub region: CropRegion,
    pub pixel_rect: PixelRect,
    pub auto_detected: bool,
    pub output_width: u32,
    pub output_height: u32,
    /// Otsu threshold when binarization ran
    pub threshold: Option<u8>,
    pub processing_time_ms: u64,
    pub processed_at: DateTime<Utc>,
}

/// A prepared raster ready for the OCR engine.
#[derive(Debug, Clone)]
pub struct PreparedPage {
    pub image: RgbaImage,
    pub report: PageReport,
}

/// Crops (and optionally binarizes) a single raster.
///
/// A fresh [`CropGeometryEngine`] is opened for the raster, so no state is
/// shared between calls.
pub fn prepare_image(
    raster: &RgbaImage,
    options: &PrepOptions,
    config: &PrepConfig,
) -> Result<PreparedPage, PreprocessingError> {
    let span = observability::preprocessing_span("prepare_image");
    let _enter = span.enter();
    let start_time = Instant::now();

    let result = run_steps(raster, options, config);
    let duration = start_time.elapsed();
    observability::record_page_metrics(result.is_ok(), duration);

    match result {
        Ok((image, mut report)) => {
            report.processing_time_ms = duration.as_millis() as u64;
            debug!(
                target: "ocr_preprocessing",
                "Prepared {}x{} image into {}x{} in {}ms",
                report.source_width,
                report.source_height,
                report.output_width,
                report.output_height,
                report.processing_time_ms
            );
            Ok(PreparedPage { image, report })
        }
        Err(err) => {
            error_logging::log_preprocessing_error(
                &err,
                "prepare_image",
                Some(raster.dimensions()),
                Some(duration),
            );
            Err(err)
        }
    }
}

fn run_steps(
    raster: &RgbaImage,
    options: &PrepOptions,
    config: &PrepConfig,
) -> Result<(RgbaImage, PageReport), PreprocessingError> {
    let (width, height) = raster.dimensions();
    let mut engine = CropGeometryEngine::with_config(width, height, &config.crop);
    engine.apply_aspect_ratio(options.aspect.ratio());

    let mut auto_detected = false;
    if let Some(region) = options.region {
        engine.set_region(region);
    } else if options.auto_detect {
        auto_detected = engine.auto_detect_content(raster, &config.detection).is_some();
    }

    let cropped = engine.materialize(raster)?;

    let (image, threshold) = if options.binarize {
        let thresholded = binarize(&cropped.image)?;
        (thresholded.image, Some(thresholded.threshold))
    } else {
        (cropped.image, None)
    };

    let report = PageReport {
        page: None,
        source_width: width,
        source_height: height,
        region: cropped.region,
        pixel_rect: cropped.pixel_rect,
        auto_detected,
        output_width: image.width(),
        output_height: image.height(),
        threshold,
        processing_time_ms: 0,
        processed_at: Utc::now(),
    };

    Ok((image, report))
}

/// 1-based inclusive page selection; `end == 0` means "through the last page".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl Default for PageRange {
    fn default() -> Self {
        Self::all()
    }
}

impl PageRange {
    pub fn all() -> Self {
        Self { start: 1, end: 0 }
    }

    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Resolves the selection against a document of `total` pages.
    ///
    /// Out-of-range bounds are pulled into `1..=total` and reversed bounds are
    /// swapped. Returns `None` for an empty document.
    pub fn normalize(&self, total: u32) -> Option<RangeInclusive<u32>> {
        if total == 0 {
            return None;
        }
        let mut end = if self.end == 0 || self.end > total { total } else { self.end };
        let mut start = self.start.clamp(1, total);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        Some(start..=end)
    }
}

/// Prepares the selected pages concurrently, returning them in page order.
///
/// At most `config.pipeline.max_concurrent_pages` pages run at once, each on
/// the blocking pool with its own crop engine. Cancelling `cancel` stops
/// pages that have not started yet; the call then fails with
/// `AppError::Cancelled` and finished pages are dropped. An invalid pipeline
/// configuration (such as zero concurrent pages) fails with `AppError::Config`
/// before any page is scheduled.
pub async fn prepare_pages(
    pages: Vec<RgbaImage>,
    range: PageRange,
    options: PrepOptions,
    config: &PrepConfig,
    cancel: CancellationToken,
) -> AppResult<Vec<PreparedPage>> {
    config.pipeline.validate()?;

    let total = pages.len() as u32;
    let Some(selected) = range.normalize(total) else {
        warn!("No pages to prepare");
        return Ok(Vec::new());
    };

    info!(
        "Preparing pages {}-{} of {} (max {} concurrent)",
        selected.start(),
        selected.end(),
        total,
        config.pipeline.max_concurrent_pages
    );

    let semaphore = Arc::new(Semaphore::new(config.pipeline.max_concurrent_pages));
    let config = Arc::new(config.clone());
    let mut handles = Vec::new();

    for (index, page) in pages.into_iter().enumerate() {
        let page_number = index as u32 + 1;
        if !selected.contains(&page_number) {
            continue;
        }

        let semaphore = semaphore.clone();
        let config = config.clone();
        let cancel = cancel.clone();

        handles.push(tokio::spawn(async move {
            let _permit = tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled_error(page_number)),
                permit = semaphore.acquire_owned() => permit
                    .map_err(|e| AppError::Internal(format!("Page scheduler closed: {}", e)))?,
            };
            if cancel.is_cancelled() {
                return Err(cancelled_error(page_number));
            }

            let mut prepared = tokio::task::spawn_blocking(move || prepare_image(&page, &options, &config))
                .await
                .map_err(|e| AppError::Internal(format!("Page {} task failed: {}", page_number, e)))??;
            prepared.report.page = Some(page_number);
            Ok::<PreparedPage, AppError>(prepared)
        }));
    }

    let mut prepared = Vec::with_capacity(handles.len());
    let mut first_error = None;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| AppError::Internal(format!("Page task panicked: {}", e)))
            .and_then(|result| result);
        match outcome {
            Ok(page) => prepared.push(page),
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    if let Some(err) = first_error {
        warn!(error = %err, "Page preparation stopped");
        return Err(err);
    }

    info!("Prepared {} pages", prepared.len());
    Ok(prepared)
}

fn cancelled_error(page_number: u32) -> AppError {
    AppError::Cancelled(format!("Processing cancelled before page {}", page_number))
}

/// Files written by [`prepare_file`].
#[derive(Debug, Clone)]
pub struct FileOutput {
    pub image_path: PathBuf,
    pub report_path: PathBuf,
    pub report: PageReport,
}

/// PNG name for a prepared copy of `input`: everything before the first dot, plus `.png`.
pub fn output_file_name(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        "image.png".to_string()
    } else {
        format!("{}.png", stem)
    }
}

/// PNG name for page `page_number` of a batch: `<stem>-p<N>.png`.
///
/// Pages whose inputs share a stem (`doc.001.png`, `doc.002.png`) still get
/// distinct outputs.
pub fn page_file_name(input: &Path, page_number: u32) -> String {
    let single = output_file_name(input);
    let stem = single.trim_end_matches(".png");
    format!("{}-p{}.png", stem, page_number)
}

/// Writes every prepared page of a batch next to its report.
///
/// `inputs` are the source paths in page order; each page is named with
/// [`page_file_name`].
pub fn write_pages(
    pages: &[PreparedPage],
    inputs: &[PathBuf],
    output_dir: &Path,
) -> AppResult<Vec<FileOutput>> {
    let mut written = Vec::with_capacity(pages.len());
    for (index, page) in pages.iter().enumerate() {
        let page_number = page.report.page.unwrap_or(index as u32 + 1);
        let input = page_number
            .checked_sub(1)
            .and_then(|i| inputs.get(i as usize))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Page {} has no matching input ({} inputs given)",
                    page_number,
                    inputs.len()
                ))
            })?;
        written.push(write_prepared(page, output_dir, &page_file_name(input, page_number))?);
    }
    Ok(written)
}

/// Decodes `input`, prepares it and writes the PNG plus a JSON report into `output_dir`.
pub fn prepare_file(
    input: &Path,
    output_dir: &Path,
    options: &PrepOptions,
    config: &PrepConfig,
) -> AppResult<FileOutput> {
    let raster = load_raster(input)?;
    let prepared = prepare_image(&raster, options, config)?;
    write_prepared(&prepared, output_dir, &output_file_name(input))
}

/// Decodes any format the `image` crate supports into an RGBA raster.
pub fn load_raster(input: &Path) -> Result<RgbaImage, PreprocessingError> {
    image::open(input)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|e| PreprocessingError::ImageLoad {
            message: format!("Failed to load image '{}': {}", input.display(), e),
        })
}

/// Writes `prepared` as `<output_dir>/<file_name>` (PNG) plus a JSON report beside it.
pub fn write_prepared(
    prepared: &PreparedPage,
    output_dir: &Path,
    file_name: &str,
) -> AppResult<FileOutput> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        error_logging::log_filesystem_error(&e, "create_output_dir", output_dir.to_str());
        AppError::FileSystem(format!(
            "Failed to create output directory '{}': {}",
            output_dir.display(),
            e
        ))
    })?;

    let image_path = output_dir.join(file_name);
    let report_path = image_path.with_extension("json");

    prepared
        .image
        .save_with_format(&image_path, ImageFormat::Png)
        .map_err(|e| {
            error_logging::log_filesystem_error(&e, "write_png", image_path.to_str());
            AppError::FileSystem(format!("Failed to write '{}': {}", image_path.display(), e))
        })?;
    std::fs::write(&report_path, serde_json::to_string_pretty(&prepared.report)?)?;

    info!(output = %image_path.display(), "Prepared image written");

    Ok(FileOutput {
        image_path,
        report_path,
        report: prepared.report.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_page_range_defaults_to_all_pages() {
        assert_eq!(PageRange::all().normalize(5), Some(1..=5));
        assert_eq!(PageRange::default().normalize(1), Some(1..=1));
    }

    #[test]
    fn test_page_range_clamps_and_swaps() {
        assert_eq!(PageRange::new(0, 99).normalize(4), Some(1..=4));
        assert_eq!(PageRange::new(4, 2).normalize(6), Some(2..=4));
        assert_eq!(PageRange::new(10, 0).normalize(3), Some(3..=3));
        assert_eq!(PageRange::new(2, 3).normalize(0), None);
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(Path::new("/tmp/scan.page1.jpg")), "scan.png");
        assert_eq!(output_file_name(Path::new("receipt.JPEG")), "receipt.png");
        assert_eq!(output_file_name(Path::new(".hidden")), "image.png");
        assert_eq!(page_file_name(Path::new("doc.001.png"), 1), "doc-p1.png");
        assert_ne!(
            page_file_name(Path::new("doc.001.png"), 1),
            page_file_name(Path::new("doc.002.png"), 2)
        );
    }

    #[test]
    fn test_prepare_image_without_crop_keeps_size() {
        let raster = RgbaImage::from_pixel(30, 20, Rgba([90, 90, 90, 255]));
        let prepared = prepare_image(&raster, &PrepOptions::default(), &PrepConfig::default())
            .expect("full-image preparation should succeed");
        assert_eq!(prepared.image.dimensions(), (30, 20));
        assert_eq!(prepared.report.region, CropRegion::FULL);
        assert_eq!(prepared.report.threshold, None);
        assert!(!prepared.report.auto_detected);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_prepare_image_logs_under_preprocessing_target() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let raster = RgbaImage::from_pixel(8, 8, Rgba([200, 200, 200, 255]));
        tracing::subscriber::with_default(subscriber, || {
            prepare_image(&raster, &PrepOptions::default(), &PrepConfig::default())
                .expect("full-image preparation should succeed");
        });

        let output = String::from_utf8(logs.0.lock().expect("log buffer").clone()).expect("utf8 logs");
        assert!(
            output
                .lines()
                .any(|line| line.contains("ocr_preprocessing") && line.contains("Prepared 8x8 image")),
            "missing targeted event in: {}",
            output
        );
    }

    #[test]
    fn test_explicit_region_beats_auto_detect() {
        let mut raster = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        raster.put_pixel(50, 50, Rgba([0, 0, 0, 255]));
        let options = PrepOptions {
            region: Some(CropRegion::new(0.0, 0.0, 0.5, 0.5)),
            auto_detect: true,
            ..Default::default()
        };
        let prepared = prepare_image(&raster, &options, &PrepConfig::default())
            .expect("explicit region should crop");
        assert_eq!(prepared.image.dimensions(), (50, 50));
        assert!(!prepared.report.auto_detected);
    }

    #[test]
    fn test_empty_raster_is_invalid_region() {
        let err = prepare_image(&RgbaImage::new(0, 0), &PrepOptions::default(), &PrepConfig::default())
            .expect_err("empty raster cannot be cropped");
        assert!(matches!(err, PreprocessingError::InvalidRegion { .. }));
    }
}
