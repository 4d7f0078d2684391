//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliBorderMode, CliGrowthPolicy};
use crate::{
    config::{BorderMode, GrowthPolicy, OutputFormat, RemovalConfig},
    processor::{ProcessorConfig, ProcessorConfigBuilder},
};
use anyhow::{Context, Result};

/// Convert CLI arguments to a `ProcessorConfig`
///
/// Values resolve in order: built-in defaults, then the `--config` JSON
/// file, then individual flags.
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    pub(crate) fn from_cli(cli: &Cli) -> Result<ProcessorConfig> {
        let base = match &cli.config {
            Some(path) => RemovalConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => RemovalConfig::default(),
        };

        let mut params = base.params.clone();
        if let Some(window) = cli.window {
            params.saliency_window = window;
        }
        if let Some(threshold) = cli.seed_threshold {
            params.seed_threshold = threshold;
        }
        if let Some(threshold) = cli.growth_threshold {
            params.growth_threshold = threshold;
        }
        if let Some(kernel) = cli.kernel {
            params.morphology_kernel = kernel;
        }
        if let Some(feather) = cli.feather {
            params.feather_radius = feather;
        }
        if let Some(floor) = cli.alpha_floor {
            params.edge_alpha_floor = floor;
        }
        if let Some(policy) = cli.growth_policy {
            params.growth_policy = match policy {
                CliGrowthPolicy::ExploreAll => GrowthPolicy::ExploreAll,
                CliGrowthPolicy::PassingOnly => GrowthPolicy::PassingOnly,
            };
        }
        if let Some(mode) = cli.border_mode {
            params.border_mode = match mode {
                CliBorderMode::Skip => BorderMode::Skip,
                CliBorderMode::Clamp => BorderMode::Clamp,
            };
        }

        let output_format = cli.format.map_or(base.output_format, OutputFormat::from);

        let config = ProcessorConfigBuilder::new()
            .params(params)
            .output_format(output_format)
            .jpeg_quality(cli.jpeg_quality.unwrap_or(base.jpeg_quality))
            .webp_quality(cli.webp_quality.unwrap_or(base.webp_quality))
            .parallel(base.parallel && !cli.sequential)
            .debug(base.debug || cli.verbose >= 2)
            .verbose_progress(cli.verbose >= 1)
            .build()
            .context("Invalid configuration")?;

        Ok(config)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        for (name, quality) in [("JPEG", cli.jpeg_quality), ("WebP", cli.webp_quality)] {
            if let Some(q) = quality {
                if q > 100 {
                    anyhow::bail!("{} quality must be between 0 and 100, got {}", name, q);
                }
            }
        }

        let reads_stdin = cli.input.iter().any(|i| i == "-");
        if reads_stdin && cli.input.len() > 1 {
            anyhow::bail!("stdin (-) cannot be combined with other inputs");
        }

        if let Some(path) = &cli.config {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        Ok(())
    }
}
