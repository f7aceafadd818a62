//! CLI tool for cleaning up and fusing slide layout detections.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use slidefuse_core::{
    DetectedElement, DetectionSettings, DetectionSource, FusionResult, FusionStats,
    LayoutAnalyzer, OcrPage,
};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Validate, deduplicate and fuse slide layout detections.
#[derive(Parser, Debug)]
#[command(name = "slidefuse")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw vision-model response (JSON, optionally wrapped in markdown)
    input: PathBuf,

    /// OCR page JSON to fuse with the vision-model detections
    #[arg(long)]
    ocr: Option<PathBuf>,

    /// Detection settings JSON
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Minimum detection confidence (0-1)
    #[arg(short, long)]
    confidence: Option<f64>,

    /// IoU needed to pair a vision-model box with an OCR box (0-1)
    #[arg(long)]
    iou: Option<f64>,

    /// Keep vision-model boxes for matched text instead of the OCR boxes
    #[arg(long)]
    keep_primary_boxes: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Final layout written by the CLI.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOutput {
    background_color: String,
    elements: Vec<DetectedElement>,
    source: DetectionSource,
    stats: FusionStats,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let settings = load_settings(&args)?;
    let analyzer = LayoutAnalyzer::new(settings);

    let output = process_file(&args, &analyzer)?;
    let json = serde_json::to_string_pretty(&output).context("Failed to serialize layout")?;

    match &args.output {
        Some(path) => {
            write_output(path, &json)?;
            log::info!("Written to: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Build detection settings from the settings file and command line overrides.
fn load_settings(args: &Args) -> Result<DetectionSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let text = read_file(path)?;
            DetectionSettings::from_json(&text)
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        }
        None => DetectionSettings::default(),
    };

    if let Some(confidence) = args.confidence {
        settings = settings.with_confidence_threshold(confidence);
    }
    if let Some(iou) = args.iou {
        settings = settings.with_fusion_iou_threshold(iou);
    }
    if args.keep_primary_boxes {
        settings = settings.with_prefer_client_boxes(false);
    }
    if args.ocr.is_some() {
        settings = settings.with_hybrid_detection(true);
    }

    settings.validate()?;
    Ok(settings)
}

/// Analyze one detector response, fusing OCR output when given.
fn process_file(args: &Args, analyzer: &LayoutAnalyzer) -> Result<LayoutOutput> {
    let text = read_file(&args.input)?;
    let response = analyzer
        .analyze_response(&text)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    log::debug!(
        "{} detections kept from {}",
        response.elements.len(),
        args.input.display()
    );

    let fused: FusionResult = match &args.ocr {
        Some(path) => {
            let page: OcrPage = serde_json::from_str(&read_file(path)?)
                .with_context(|| format!("Invalid OCR page in {}", path.display()))?;
            analyzer.fuse_with_ocr(response.elements, &page)?
        }
        None => FusionResult::primary_only(response.elements),
    };

    Ok(LayoutOutput {
        background_color: response.background_color,
        elements: fused.elements,
        source: fused.source,
        stats: fused.stats,
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
