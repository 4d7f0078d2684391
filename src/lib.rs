#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Saliency Background Removal
//!
//! Offline background removal built from classical computer vision only:
//! no model files, no network access, no GPU.
//!
//! The pipeline runs four stages over an RGBA raster:
//!
//! 1. **Saliency analysis**: every interior pixel is scored by its mean colour
//!    distance to a `W × W` neighbourhood.
//! 2. **Region growing**: a flood fill from the saliency-weighted centroid
//!    keeps pixels above the growth threshold.
//! 3. **Mask refinement**: a max-filter pass then a min-filter pass close
//!    small holes.
//! 4. **Alpha matting**: background becomes transparent and the foreground
//!    boundary is feathered by local mask coverage.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use saliency_bgremove::{remove_background_from_bytes, RemovalConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let bytes = std::fs::read("portrait.jpg")?;
//! let config = RemovalConfig::default();
//! let result = remove_background_from_bytes(&bytes, &config)?;
//! result.save_png("portrait.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `parallel` (default): row-parallel saliency, refinement and matting via rayon
//! - `cli` (default): command-line interface, progress bars and tracing setup
//! - `webp-support` (default): WebP input and output
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! saliency-bgremove = { version = "0.1", default-features = false, features = ["parallel"] }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use image::{DynamicImage, RgbaImage};
use tokio::io::AsyncRead;

pub use config::{BorderMode, GrowthPolicy, OutputFormat, PipelineParams, RemovalConfig};
pub use error::{BgRemovalError, Result};
pub use pipeline::{AlphaMatteCompositor, MaskRefiner, RegionSegmenter, SaliencyAnalyzer};
pub use processor::{BackgroundRemovalProcessor, ProcessorConfig, ProcessorConfigBuilder};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{
    Centroid, MaskStatistics, ProcessingMetadata, ProcessingTimings, RemovalResult,
    SaliencyField, SegmentationMask,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Remove the background from an RGBA raster
///
/// Returns a new raster of the same size whose alpha channel holds the matte.
/// Rasters smaller than the saliency window come back fully transparent.
///
/// # Examples
/// ```rust
/// use image::{Rgba, RgbaImage};
/// use saliency_bgremove::{remove_background, RemovalConfig};
///
/// let input = RgbaImage::from_pixel(4, 4, Rgba([200, 40, 40, 255]));
/// let output = remove_background(&input, &RemovalConfig::default())?;
/// assert!(output.pixels().all(|p| p.0[3] == 0));
/// # Ok::<(), saliency_bgremove::BgRemovalError>(())
/// ```
pub fn remove_background(image: &RgbaImage, config: &RemovalConfig) -> Result<RgbaImage> {
    let raster = DynamicImage::ImageRgba8(image.clone());
    let result = processor::processor_for(&rgba_config(config))?.process_image(&raster)?;
    Ok(result.image.to_rgba8())
}

/// Remove the background from encoded image bytes (PNG, JPEG, TIFF, WebP)
///
/// # Examples
/// ```rust,no_run
/// use saliency_bgremove::{remove_background_from_bytes, OutputFormat, RemovalConfig};
///
/// # fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let config = RemovalConfig::builder().output_format(OutputFormat::WebP).build()?;
/// let result = remove_background_from_bytes(&upload, &config)?;
/// let encoded = result.to_bytes(config.output_format, config.webp_quality)?;
/// # Ok(())
/// # }
/// ```
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    processor::processor_for(config)?.process_bytes(image_bytes)
}

/// Remove the background from an already decoded image
pub fn remove_background_from_image(
    image: &DynamicImage,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    processor::processor_for(config)?.process_image(image)
}

/// Remove the background from an async byte stream
///
/// # Examples
/// ```rust,no_run
/// use saliency_bgremove::{remove_background_from_reader, RemovalConfig};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("large_image.jpg").await?;
/// let result = remove_background_from_reader(file, &RemovalConfig::default()).await?;
/// result.save_png("output.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    processor::processor_for(config)?
        .process_reader(reader)
        .await
}

/// Raster-in, raster-out callers always get RGBA back
fn rgba_config(config: &RemovalConfig) -> RemovalConfig {
    RemovalConfig {
        output_format: OutputFormat::Rgba8,
        ..config.clone()
    }
}
