//! Saliency background removal CLI
//!
//! Command-line interface over [`BackgroundRemovalProcessor`].

use super::config::CliConfigBuilder;
use crate::{
    config::OutputFormat,
    processor::BackgroundRemovalProcessor,
    services::{ImageIOService, OutputFormatHandler},
    tracing_config::{events, init_cli_tracing, spans},
    types::RemovalResult,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Offline background removal using saliency, region growing and alpha matting
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(name = "saliency-bgremove")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Output format [default: png, or the value from --config]
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// JPEG quality (0-100)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// WebP quality (0-100)
    #[arg(long)]
    pub webp_quality: Option<u8>,

    /// JSON file with pipeline parameters; flags override its values
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Saliency window side in pixels (odd)
    #[arg(long)]
    pub window: Option<u32>,

    /// Saliency above which a pixel contributes to the seed centroid
    #[arg(long)]
    pub seed_threshold: Option<f32>,

    /// Saliency above which a pixel joins the foreground
    #[arg(long)]
    pub growth_threshold: Option<f32>,

    /// Morphology kernel side in pixels (odd)
    #[arg(long)]
    pub kernel: Option<u32>,

    /// Feather radius of the alpha matte
    #[arg(long)]
    pub feather: Option<u32>,

    /// Minimum alpha of foreground pixels on the boundary
    #[arg(long)]
    pub alpha_floor: Option<u8>,

    /// Region growing frontier policy
    #[arg(long, value_enum)]
    pub growth_policy: Option<CliGrowthPolicy>,

    /// Border handling of the mask refiner
    #[arg(long, value_enum)]
    pub border_mode: Option<CliBorderMode>,

    /// Also write the refined mask as `<name>_mask.png`
    #[arg(long)]
    pub save_mask: bool,

    /// Disable row-parallel processing
    #[arg(long)]
    pub sequential: bool,

    /// Enable verbose logging (-v: DEBUG for this crate, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directory recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for batch processing (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Emit logs as JSON lines (requires the `tracing-json` feature)
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
    Rgba8,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Webp => OutputFormat::WebP,
            CliOutputFormat::Tiff => OutputFormat::Tiff,
            CliOutputFormat::Rgba8 => OutputFormat::Rgba8,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliGrowthPolicy {
    ExploreAll,
    PassingOnly,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliBorderMode {
    Skip,
    Clamp,
}

/// Outcome counts of a CLI run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunSummary {
    processed: usize,
    failed: usize,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id =
        init_cli_tracing(cli.verbose, cli.json_logs).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let _session = spans::session(&session_id, &config.params).entered();
    info!("Input(s): {}", cli.input.join(", "));
    debug!(?config, "Resolved configuration");

    let mut processor = BackgroundRemovalProcessor::new(config)
        .context("Failed to create background removal processor")?;

    let start_time = Instant::now();
    let summary = process_inputs(&cli, &mut processor).await?;
    info!(
        "Processed {} image(s) in {:.2}s",
        summary.processed,
        start_time.elapsed().as_secs_f64()
    );

    if summary.processed == 0 && summary.failed > 0 {
        anyhow::bail!("All {} input(s) failed to process", summary.failed);
    }

    Ok(())
}

async fn process_inputs(
    cli: &Cli,
    processor: &mut BackgroundRemovalProcessor,
) -> Result<RunSummary> {
    if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        process_stdin(cli, processor).await?;
        return Ok(RunSummary {
            processed: 1,
            failed: 0,
        });
    }

    let all_files = collect_input_files(&cli.input, cli.recursive, cli.pattern.as_deref())?;
    if all_files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(RunSummary::default());
    }

    let file_count = all_files.len();
    let _batch = spans::batch_processing(file_count).entered();
    info!("Found {} image file(s) to process", file_count);

    let output_dir = prepare_output_dir(cli.output.as_deref(), file_count)?;

    let progress = if file_count > 1 {
        let pb = ProgressBar::new(file_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut summary = RunSummary::default();
    let batch_start = Instant::now();
    let format = processor.config().output_format;

    for input_file in &all_files {
        if let Some(ref pb) = progress {
            pb.set_message(format!("{}", input_file.display()));
        }

        let output_path = if file_count == 1 {
            cli.output.clone()
        } else {
            output_dir
                .as_ref()
                .map(|dir| output_path_in_dir(input_file, dir, format).display().to_string())
        };

        match process_single_file(processor, input_file, output_path.as_deref(), cli.save_mask) {
            Ok(()) => summary.processed += 1,
            Err(e) => {
                error!("Failed to process {}: {:#}", input_file.display(), e);
                if let Some(source) = e.downcast_ref::<crate::error::BgRemovalError>() {
                    events::error_with_context(source, &input_file.display().to_string());
                }
                summary.failed += 1;
            },
        }

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Completed! Processed: {}, Failed: {}",
            summary.processed, summary.failed
        ));
    }

    if summary.failed > 0 {
        warn!(
            "Some files failed to process. Processed: {}, Failed: {}",
            summary.processed, summary.failed
        );
    }

    if file_count > 1 {
        let total = batch_start.elapsed();
        info!(
            "Batch: {} processed, {} failed, {:.2}s total, {:.2}s per file",
            summary.processed,
            summary.failed,
            total.as_secs_f64(),
            if summary.processed > 0 {
                total.as_secs_f64() / summary.processed as f64
            } else {
                0.0
            }
        );
    }

    Ok(summary)
}

/// Read one image from stdin; the result goes to stdout unless `--output` names a file
async fn process_stdin(cli: &Cli, processor: &mut BackgroundRemovalProcessor) -> Result<()> {
    info!("Reading image from stdin");
    let start_time = Instant::now();

    let result = processor
        .process_reader(tokio::io::stdin())
        .await
        .context("Failed to remove background from stdin data")?;

    events::performance_metric("stdin", start_time.elapsed().as_millis() as u64);

    match cli.output.as_deref() {
        Some(target) if target != "-" => {
            let path = PathBuf::from(target);
            save_result(processor, result, &path, cli.save_mask)?;
            info!("Image saved to: {}", path.display());
        },
        _ => {
            if cli.save_mask {
                warn!("--save-mask is ignored when writing to stdout");
            }
            let config = processor.config();
            let data = result.to_bytes(config.output_format, config.output_quality())?;
            write_stdout(&data)?;
            info!("Image written to stdout");
        },
    }

    Ok(())
}

fn process_single_file(
    processor: &mut BackgroundRemovalProcessor,
    input_path: &Path,
    output_path: Option<&str>,
    save_mask: bool,
) -> Result<()> {
    let _span = spans::file_processing(input_path).entered();

    let result = processor
        .process_file(input_path)
        .context("Failed to remove background")?;

    if result.metadata.degraded {
        warn!(
            "{} is smaller than the saliency window; output is fully transparent",
            input_path.display()
        );
    }

    match output_path {
        Some("-") => {
            info!("{}: {}", input_path.display(), result.timing_summary());
            let config = processor.config();
            let data = result.to_bytes(config.output_format, config.output_quality())?;
            write_stdout(&data)?;
        },
        Some(target) => save_result(processor, result, Path::new(target), save_mask)?,
        None => {
            let target = default_output_path(input_path, processor.config().output_format);
            save_result(processor, result, &target, save_mask)?;
        },
    }

    Ok(())
}

fn save_result(
    processor: &mut BackgroundRemovalProcessor,
    mut result: RemovalResult,
    path: &Path,
    save_mask: bool,
) -> Result<()> {
    processor
        .save_result(&mut result, path)
        .with_context(|| format!("Failed to save result to {}", path.display()))?;
    events::performance_metric("encode", result.timings().image_encode_ms.unwrap_or(0));
    info!("{}: {}", path.display(), result.timing_summary());

    if save_mask {
        let mask_path = mask_path_for(path);
        result
            .mask
            .save_png(&mask_path)
            .with_context(|| format!("Failed to save mask to {}", mask_path.display()))?;
        debug!(path = %mask_path.display(), "Saved mask");
    }

    Ok(())
}

fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Expand files and directories into a sorted list of supported images
fn collect_input_files(
    inputs: &[String],
    recursive: bool,
    pattern: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();

    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(&path, recursive, pattern)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    all_files.sort();
    all_files.dedup();
    Ok(all_files)
}

fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && ImageIOService::is_supported_format(path)
            && matches_pattern(path, pattern)
        {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    let Some(pat) = pattern else {
        return true;
    };
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| glob::Pattern::new(pat).is_ok_and(|p| p.matches(name)))
}

fn prepare_output_dir(output: Option<&str>, file_count: usize) -> Result<Option<PathBuf>> {
    if file_count <= 1 {
        return Ok(None);
    }
    let Some(output) = output else {
        return Ok(None);
    };
    if output == "-" {
        anyhow::bail!("Cannot use stdout (-) as output when processing multiple files");
    }

    let output_path = PathBuf::from(output);
    if output_path.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            output_path.display()
        );
    }
    std::fs::create_dir_all(&output_path).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;
    Ok(Some(output_path))
}

fn output_file_name(input_path: &Path, format: OutputFormat) -> String {
    let stem = input_path.file_stem().unwrap_or_default();
    format!(
        "{}_bg_removed.{}",
        stem.to_string_lossy(),
        OutputFormatHandler::get_extension(format)
    )
}

/// `<stem>_bg_removed.<ext>` next to the input
fn default_output_path(input_path: &Path, format: OutputFormat) -> PathBuf {
    let dir = input_path.parent().unwrap_or(Path::new("."));
    dir.join(output_file_name(input_path, format))
}

fn output_path_in_dir(input_path: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
    output_dir.join(output_file_name(input_path, format))
}

/// `<dir>/<stem>_mask.png` for an output path
fn mask_path_for(output_path: &Path) -> PathBuf {
    let stem = output_path.file_stem().unwrap_or_default().to_string_lossy();
    let dir = output_path.parent().unwrap_or(Path::new("."));
    dir.join(format!("{}_mask.png", stem))
}
