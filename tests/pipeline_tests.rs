//! # Pipeline Tests
//!
//! End-to-end preparation of single images, page batches and files on disk.

mod test_helpers;

#[cfg(test)]
mod tests {
    use crate::test_helpers::{document_page, white_canvas};
    use image::RgbaImage;
    use ocr_prep::config::PrepConfig;
    use ocr_prep::errors::AppError;
    use ocr_prep::pipeline::{
        prepare_file, prepare_image, prepare_pages, write_pages, PageRange, PageReport,
        PrepOptions,
    };
    use ocr_prep::preprocessing::{AspectPreset, CropRegion};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn pages(count: u32) -> Vec<RgbaImage> {
        (0..count)
            .map(|i| document_page(100 + i * 10, 80, 10, 10, 40, 20))
            .collect()
    }

    /// Auto-detect, crop and binarize a document photo
    #[test]
    fn test_prepare_image_full_flow() {
        let raster = document_page(400, 300, 100, 100, 200, 50);
        let options = PrepOptions {
            auto_detect: true,
            binarize: true,
            ..Default::default()
        };

        let prepared = prepare_image(&raster, &options, &PrepConfig::default())
            .expect("preparation should succeed");

        // 200px wide text block gets 10px of padding on every side
        assert_eq!(prepared.image.dimensions(), (220, 70));
        assert!(prepared.report.auto_detected);
        assert!(prepared.report.threshold.is_some());
        assert_eq!(prepared.report.source_width, 400);
        assert_eq!(prepared.report.pixel_rect.x, 90);
    }

    /// Aspect presets shape the crop even without detection
    #[test]
    fn test_prepare_image_with_aspect_preset() {
        let raster = white_canvas(300, 100);
        let options = PrepOptions {
            aspect: AspectPreset::Square,
            ..Default::default()
        };

        let prepared = prepare_image(&raster, &options, &PrepConfig::default())
            .expect("preparation should succeed");
        assert_eq!(prepared.image.dimensions(), (100, 100));
    }

    /// Blank pages fall back to the full image when auto-detect finds nothing
    #[test]
    fn test_auto_detect_on_blank_page_keeps_full_image() {
        let options = PrepOptions {
            auto_detect: true,
            ..Default::default()
        };
        let prepared = prepare_image(&white_canvas(60, 40), &options, &PrepConfig::default())
            .expect("blank page is still valid");
        assert_eq!(prepared.image.dimensions(), (60, 40));
        assert!(!prepared.report.auto_detected);
        assert_eq!(prepared.report.region, CropRegion::FULL);
    }

    /// Reports round-trip through JSON
    #[test]
    fn test_report_serializes() {
        let prepared = prepare_image(&white_canvas(10, 10), &PrepOptions::default(), &PrepConfig::default())
            .expect("preparation should succeed");
        let json = serde_json::to_string(&prepared.report).expect("report serializes");
        let parsed: PageReport = serde_json::from_str(&json).expect("report deserializes");
        assert_eq!(parsed, prepared.report);
    }

    /// Selected pages come back in page order with page numbers set
    #[tokio::test]
    async fn test_prepare_pages_in_order() {
        let config = PrepConfig::default();
        let prepared = prepare_pages(
            pages(6),
            PageRange::new(2, 5),
            PrepOptions::default(),
            &config,
            CancellationToken::new(),
        )
        .await
        .expect("batch should succeed");

        let numbers: Vec<_> = prepared.iter().map(|p| p.report.page).collect();
        assert_eq!(numbers, vec![Some(2), Some(3), Some(4), Some(5)]);
        assert_eq!(prepared[0].image.width(), 110);
        assert_eq!(prepared[3].image.width(), 140);
    }

    /// Concurrency limit of one still processes every page
    #[tokio::test]
    async fn test_prepare_pages_sequential_limit() {
        let mut config = PrepConfig::default();
        config.pipeline.max_concurrent_pages = 1;

        let prepared = prepare_pages(pages(3), PageRange::all(), PrepOptions::default(), &config, CancellationToken::new())
            .await
            .expect("batch should succeed");
        assert_eq!(prepared.len(), 3);
    }

    /// Empty documents produce no pages
    #[tokio::test]
    async fn test_prepare_pages_empty_document() {
        let prepared = prepare_pages(
            Vec::new(),
            PageRange::all(),
            PrepOptions::default(),
            &PrepConfig::default(),
            CancellationToken::new(),
        )
        .await
        .expect("empty batch is fine");
        assert!(prepared.is_empty());
    }

    /// A cancelled token stops the batch before any page starts
    #[tokio::test]
    async fn test_prepare_pages_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = prepare_pages(pages(4), PageRange::all(), PrepOptions::default(), &PrepConfig::default(), cancel).await;
        assert!(matches!(result, Err(AppError::Cancelled(_))));
    }

    /// A failing page fails the batch
    #[tokio::test]
    async fn test_prepare_pages_propagates_page_error() {
        let mut batch = pages(2);
        batch.push(RgbaImage::new(0, 0));

        let result = prepare_pages(batch, PageRange::all(), PrepOptions::default(), &PrepConfig::default(), CancellationToken::new()).await;
        assert!(matches!(result, Err(AppError::Preprocessing(_))));
    }

    /// Zero concurrency is rejected up front instead of stalling every page
    #[tokio::test]
    async fn test_prepare_pages_rejects_zero_concurrency() {
        let mut config = PrepConfig::default();
        config.pipeline.max_concurrent_pages = 0;

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            prepare_pages(pages(1), PageRange::all(), PrepOptions::default(), &config, CancellationToken::new()),
        )
        .await
        .expect("batch must not hang");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    /// Batch pages whose inputs share a stem get distinct outputs
    #[tokio::test]
    async fn test_write_pages_keeps_shared_stems_apart() {
        let dir = TempDir::new().expect("temp dir");
        let inputs = vec![PathBuf::from("doc.001.png"), PathBuf::from("doc.002.png")];
        let prepared = prepare_pages(
            pages(2),
            PageRange::all(),
            PrepOptions::default(),
            &PrepConfig::default(),
            CancellationToken::new(),
        )
        .await
        .expect("batch should succeed");

        let written = write_pages(&prepared, &inputs, dir.path()).expect("pages written");
        assert_eq!(written[0].image_path, dir.path().join("doc-p1.png"));
        assert_eq!(written[1].image_path, dir.path().join("doc-p2.png"));
        assert_ne!(written[0].report_path, written[1].report_path);

        let first = image::open(&written[0].image_path).expect("page 1 decodes").to_rgba8();
        let second = image::open(&written[1].image_path).expect("page 2 decodes").to_rgba8();
        assert_eq!(first.width(), 100);
        assert_eq!(second.width(), 110);
    }

    /// Pages without a matching input path are reported, not written
    #[tokio::test]
    async fn test_write_pages_requires_inputs() {
        let dir = TempDir::new().expect("temp dir");
        let prepared = prepare_pages(pages(2), PageRange::all(), PrepOptions::default(), &PrepConfig::default(), CancellationToken::new())
            .await
            .expect("batch should succeed");

        let result = write_pages(&prepared, &[PathBuf::from("only.png")], dir.path());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    /// Files are decoded, prepared and written as `<stem>.png` plus a report
    #[test]
    fn test_prepare_file_writes_outputs() {
        let dir = TempDir::new().expect("temp dir");
        let input = dir.path().join("receipt.scan.jpg.png");
        document_page(80, 60, 10, 10, 30, 10)
            .save(&input)
            .expect("write input image");

        let out_dir = dir.path().join("out");
        let options = PrepOptions {
            region: Some(CropRegion::new(0.0, 0.0, 0.5, 0.5)),
            binarize: true,
            ..Default::default()
        };
        let output = prepare_file(&input, &out_dir, &options, &PrepConfig::default())
            .expect("file preparation should succeed");

        assert_eq!(output.image_path, out_dir.join("receipt.png"));
        assert_eq!(output.report_path, out_dir.join("receipt.json"));

        let written = image::open(&output.image_path).expect("output decodes").to_rgba8();
        assert_eq!(written.dimensions(), (40, 30));

        let report: PageReport = serde_json::from_str(
            &std::fs::read_to_string(&output.report_path).expect("report exists"),
        )
        .expect("report parses");
        assert_eq!(report.output_width, 40);
        assert!(report.threshold.is_some());
    }

    /// Missing inputs surface as preprocessing errors
    #[test]
    fn test_prepare_file_missing_input() {
        let dir = TempDir::new().expect("temp dir");
        let result = prepare_file(
            &dir.path().join("missing.png"),
            dir.path(),
            &PrepOptions::default(),
            &PrepConfig::default(),
        );
        assert!(matches!(result, Err(AppError::Preprocessing(_))));
    }
}
