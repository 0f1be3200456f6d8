use anyhow::Result;
use ocr_prep::config::PrepConfig;
use ocr_prep::errors::{error_logging, AppError, AppResult};
use ocr_prep::observability;
use ocr_prep::pipeline::{self, PageRange, PrepOptions};
use ocr_prep::preprocessing::{AspectPreset, CropRegion};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const USAGE: &str = "Usage: ocr-prep <input>... [--out DIR] [--ratio W:H|free] [--region x,y,w,h] \
[--auto-detect] [--binarize|--no-binarize] [--pages START-END]";

/// Command line arguments
#[derive(Debug)]
struct CliArgs {
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    options: PrepOptions,
    pages: PageRange,
}

/// Parse `x,y,w,h` in normalized coordinates
fn parse_region(raw: &str) -> AppResult<CropRegion> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Validation(format!("Invalid --region '{}': {}", raw, e)))?;

    if values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Validation(format!(
            "Invalid --region '{}': values must be finite numbers",
            raw
        )));
    }

    match values.as_slice() {
        [x, y, width, height] => Ok(CropRegion::new(*x, *y, *width, *height)),
        _ => Err(AppError::Validation(format!(
            "Invalid --region '{}': expected four comma-separated numbers",
            raw
        ))),
    }
}

/// Parse `START-END` (1-based, either side may be omitted)
fn parse_pages(raw: &str) -> Result<PageRange> {
    let (start, end) = raw.split_once('-').unwrap_or((raw, raw));
    let parse_bound = |bound: &str, default: u32| -> Result<u32> {
        if bound.trim().is_empty() {
            return Ok(default);
        }
        bound
            .trim()
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid --pages '{}'", raw))
    };
    Ok(PageRange::new(parse_bound(start, 1)?, parse_bound(end, 0)?))
}

fn parse_args(mut args: impl Iterator<Item = String>, config: &PrepConfig) -> Result<CliArgs> {
    let mut parsed = CliArgs {
        inputs: Vec::new(),
        output_dir: PathBuf::from("."),
        options: PrepOptions::from_config(config),
        pages: PageRange::all(),
    };

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow::anyhow!("{} requires a value\n{}", flag, USAGE))
        };

        match arg.as_str() {
            "--out" => parsed.output_dir = PathBuf::from(value("--out")?),
            "--ratio" => {
                let raw = value("--ratio")?;
                parsed.options.aspect = raw.parse::<AspectPreset>().map_err(AppError::Validation)?;
            }
            "--region" => parsed.options.region = Some(parse_region(&value("--region")?)?),
            "--pages" => parsed.pages = parse_pages(&value("--pages")?)?,
            "--auto-detect" => parsed.options.auto_detect = true,
            "--binarize" => parsed.options.binarize = true,
            "--no-binarize" => parsed.options.binarize = false,
            "-h" | "--help" => return Err(anyhow::anyhow!("{}", USAGE)),
            flag if flag.starts_with("--") => {
                return Err(anyhow::anyhow!("Unknown option '{}'\n{}", flag, USAGE))
            }
            input => parsed.inputs.push(PathBuf::from(input)),
        }
    }

    if parsed.inputs.is_empty() {
        return Err(anyhow::anyhow!("No input image given\n{}", USAGE));
    }

    Ok(parsed)
}

/// Prepare a single file on the blocking pool and print its report
async fn run_single(args: CliArgs, config: PrepConfig) -> Result<()> {
    let input = args.inputs[0].clone();
    let output = tokio::task::spawn_blocking(move || {
        pipeline::prepare_file(&input, &args.output_dir, &args.options, &config)
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&output.report)?);
    Ok(())
}

/// Treat every input as one page of a document and prepare the selected range
async fn run_pages(args: CliArgs, config: PrepConfig) -> Result<()> {
    let mut pages = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        pages.push(pipeline::load_raster(input)?);
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling remaining pages");
            ctrl_c_token.cancel();
        }
    });

    let prepared = pipeline::prepare_pages(pages, args.pages, args.options, &config, cancel).await?;

    let reports: Vec<_> = pipeline::write_pages(&prepared, &args.inputs, &args.output_dir)?
        .into_iter()
        .map(|written| written.report)
        .collect();

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = PrepConfig::from_env()?;
    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "startup", "validate");
        return Err(anyhow::anyhow!(
            "Configuration validation failed: {}. Please check your environment variables.",
            e
        ));
    }

    let metrics_handle = observability::init_observability(&config.observability)?;
    info!("{}", config.summary());

    let args = parse_args(std::env::args().skip(1), &config)?;
    info!(
        inputs = args.inputs.len(),
        output_dir = %args.output_dir.display(),
        aspect = %args.options.aspect,
        auto_detect = args.options.auto_detect,
        binarize = args.options.binarize,
        "Starting image preparation"
    );

    let metrics_dump_path = config.observability.metrics_dump_path.clone();
    let result = if args.inputs.len() == 1 {
        run_single(args, config).await
    } else {
        run_pages(args, config).await
    };

    if let (Some(handle), Some(path)) = (metrics_handle.as_ref(), metrics_dump_path.as_deref()) {
        if let Err(e) = observability::dump_metrics(handle, path) {
            error_logging::log_filesystem_error(&e, "dump_metrics", Some(path));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_full_command_line() {
        let config = PrepConfig::default();
        let parsed = parse_args(
            args(&["scan.jpg", "--out", "/tmp/out", "--ratio", "4:3", "--auto-detect", "--binarize"]),
            &config,
        )
        .expect("valid arguments");

        assert_eq!(parsed.inputs, vec![PathBuf::from("scan.jpg")]);
        assert_eq!(parsed.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(parsed.options.aspect, AspectPreset::FourThree);
        assert!(parsed.options.auto_detect);
        assert!(parsed.options.binarize);
    }

    #[test]
    fn test_parse_region_and_pages() {
        assert_eq!(
            parse_region("0.1, 0.2, 0.5, 0.4").expect("four numbers"),
            CropRegion::new(0.1, 0.2, 0.5, 0.4)
        );
        assert!(parse_region("0.1,0.2").is_err());
        assert!(parse_region("a,b,c,d").is_err());
        assert!(matches!(parse_region("nan,0,0.5,0.5"), Err(AppError::Validation(_))));
        assert!(matches!(parse_region("0,0,inf,0.5"), Err(AppError::Validation(_))));

        assert_eq!(parse_pages("2-5").expect("range"), PageRange::new(2, 5));
        assert_eq!(parse_pages("3").expect("single page"), PageRange::new(3, 3));
        assert_eq!(parse_pages("4-").expect("open end"), PageRange::new(4, 0));
        assert!(parse_pages("x-2").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_input_and_unknown_flags() {
        let config = PrepConfig::default();
        assert!(parse_args(args(&["--binarize"]), &config).is_err());
        assert!(parse_args(args(&["a.png", "--rotate"]), &config).is_err());
        assert!(parse_args(args(&["a.png", "--out"]), &config).is_err());

        let err = parse_args(args(&["a.png", "--ratio", "wide"]), &config).expect_err("bad ratio");
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Validation(_))));
    }
}
