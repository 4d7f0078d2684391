//! Configuration types for background removal operations

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How region growing expands its frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthPolicy {
    /// Push neighbours of every visited pixel, whether or not it joined the mask.
    /// Low-saliency pixels act as unmasked bridges between salient regions.
    #[default]
    ExploreAll,
    /// Push neighbours only from pixels that joined the mask
    PassingOnly,
}

impl std::fmt::Display for GrowthPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExploreAll => write!(f, "explore-all"),
            Self::PassingOnly => write!(f, "passing-only"),
        }
    }
}

impl std::str::FromStr for GrowthPolicy {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "explore-all" | "explore_all" | "all" => Ok(Self::ExploreAll),
            "passing-only" | "passing_only" | "passing" => Ok(Self::PassingOnly),
            other => Err(BgRemovalError::invalid_config(format!(
                "Unknown growth policy '{}'. Expected explore-all or passing-only",
                other
            ))),
        }
    }
}

/// Border handling for the morphological refiner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorderMode {
    /// Only pixels with a full kernel window are written; the rest stay 0
    #[default]
    Skip,
    /// Every pixel is processed with neighbour coordinates clamped to the image
    Clamp,
}

impl std::fmt::Display for BorderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Clamp => write!(f, "clamp"),
        }
    }
}

impl std::str::FromStr for BorderMode {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "clamp" => Ok(Self::Clamp),
            other => Err(BgRemovalError::invalid_config(format!(
                "Unknown border mode '{}'. Expected skip or clamp",
                other
            ))),
        }
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, alpha dropped)
    Jpeg,
    /// WebP with alpha channel transparency (lossless)
    WebP,
    /// TIFF with alpha channel transparency
    Tiff,
    /// Raw RGBA8 pixel data (4 bytes per pixel)
    Rgba8,
}

/// Tunable parameters of the segmentation pipeline
///
/// The defaults reproduce the reference behaviour: a 9×9 saliency window,
/// a seed threshold of 50, a growth threshold of 30, a 3×3 morphology kernel,
/// a feather radius of 3 and an edge alpha floor of 50.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Side of the square saliency neighbourhood (odd)
    pub saliency_window: u32,
    /// Minimum saliency for a pixel to contribute to the centroid (exclusive)
    pub seed_threshold: f32,
    /// Minimum saliency for a pixel to join the mask (exclusive)
    pub growth_threshold: f32,
    /// Side of the square structuring element (odd)
    pub morphology_kernel: u32,
    /// Feather radius of the alpha matte
    pub feather_radius: u32,
    /// Lowest alpha assigned to foreground pixels near the boundary
    pub edge_alpha_floor: u8,
    /// Frontier expansion rule for region growing
    pub growth_policy: GrowthPolicy,
    /// Border handling for mask refinement
    pub border_mode: BorderMode,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            saliency_window: 9,
            seed_threshold: 50.0,
            growth_threshold: 30.0,
            morphology_kernel: 3,
            feather_radius: 3,
            edge_alpha_floor: 50,
            growth_policy: GrowthPolicy::ExploreAll,
            border_mode: BorderMode::Skip,
        }
    }
}

impl PipelineParams {
    /// Validate parameter ranges
    ///
    /// # Errors
    /// - Even or zero saliency window / morphology kernel
    /// - Negative or non-finite thresholds
    pub fn validate(&self) -> Result<()> {
        if self.saliency_window == 0 || self.saliency_window % 2 == 0 {
            return Err(BgRemovalError::config_value_error(
                "saliency window",
                self.saliency_window,
                "odd, >= 1",
                Some(9),
            ));
        }

        if self.morphology_kernel == 0 || self.morphology_kernel % 2 == 0 {
            return Err(BgRemovalError::config_value_error(
                "morphology kernel",
                self.morphology_kernel,
                "odd, >= 1",
                Some(3),
            ));
        }

        for (name, value) in [
            ("seed threshold", self.seed_threshold),
            ("growth threshold", self.growth_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(BgRemovalError::config_value_error(
                    name,
                    value,
                    "finite, >= 0",
                    None,
                ));
            }
        }

        Ok(())
    }

    /// Half-width of the saliency window
    #[must_use]
    pub fn saliency_radius(&self) -> u32 {
        self.saliency_window / 2
    }
}

/// Configuration for background removal operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Segmentation pipeline parameters
    pub params: PipelineParams,

    /// Output format
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,

    /// WebP quality (0-100, kept for API parity; WebP output is lossless)
    pub webp_quality: u8,

    /// Split per-row work across threads when the `parallel` feature is enabled
    pub parallel: bool,

    /// Enable debug mode (additional logging)
    pub debug: bool,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            params: PipelineParams::default(),
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
            webp_quality: 85,
            parallel: true,
            debug: false,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use saliency_bgremove::{OutputFormat, RemovalConfig};
    ///
    /// let config = RemovalConfig::builder()
    ///     .output_format(OutputFormat::WebP)
    ///     .feather_radius(5)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.params.feather_radius, 5);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Invalid pipeline parameters (see [`PipelineParams::validate`])
    /// - JPEG or WebP quality above 100
    ///
    /// # Examples
    ///
    /// ```rust
    /// use saliency_bgremove::RemovalConfig;
    ///
    /// let mut config = RemovalConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.jpeg_quality = 150;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;

        if self.jpeg_quality > 100 {
            return Err(BgRemovalError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(90),
            ));
        }

        if self.webp_quality > 100 {
            return Err(BgRemovalError::config_value_error(
                "WebP quality",
                self.webp_quality,
                "0-100",
                Some(85),
            ));
        }

        Ok(())
    }

    /// Parse and validate a configuration from JSON text
    ///
    /// Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BgRemovalError::invalid_config(format!("Malformed config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| BgRemovalError::file_io_error("read config file", path_ref, &e))?;
        Self::from_json_str(&content)
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    /// Replace all pipeline parameters at once
    #[must_use]
    pub fn params(mut self, params: PipelineParams) -> Self {
        self.config.params = params;
        self
    }

    #[must_use]
    pub fn saliency_window(mut self, window: u32) -> Self {
        self.config.params.saliency_window = window;
        self
    }

    #[must_use]
    pub fn seed_threshold(mut self, threshold: f32) -> Self {
        self.config.params.seed_threshold = threshold;
        self
    }

    #[must_use]
    pub fn growth_threshold(mut self, threshold: f32) -> Self {
        self.config.params.growth_threshold = threshold;
        self
    }

    #[must_use]
    pub fn morphology_kernel(mut self, kernel: u32) -> Self {
        self.config.params.morphology_kernel = kernel;
        self
    }

    #[must_use]
    pub fn feather_radius(mut self, radius: u32) -> Self {
        self.config.params.feather_radius = radius;
        self
    }

    #[must_use]
    pub fn edge_alpha_floor(mut self, floor: u8) -> Self {
        self.config.params.edge_alpha_floor = floor;
        self
    }

    #[must_use]
    pub fn growth_policy(mut self, policy: GrowthPolicy) -> Self {
        self.config.params.growth_policy = policy;
        self
    }

    #[must_use]
    pub fn border_mode(mut self, mode: BorderMode) -> Self {
        self.config.params.border_mode = mode;
        self
    }

    /// Set output format
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set JPEG quality (clamped to 100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.min(100);
        self
    }

    /// Set WebP quality (clamped to 100)
    #[must_use]
    pub fn webp_quality(mut self, quality: u8) -> Self {
        self.config.webp_quality = quality.min(100);
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Enable debug mode
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration with validation
    ///
    /// # Errors
    /// Returns `BgRemovalError::InvalidConfig` if any parameter is out of range
    pub fn build(self) -> Result<RemovalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_match_reference_values() {
        let params = PipelineParams::default();
        assert_eq!(params.saliency_window, 9);
        assert_eq!(params.saliency_radius(), 4);
        assert_eq!(params.seed_threshold, 50.0);
        assert_eq!(params.growth_threshold, 30.0);
        assert_eq!(params.morphology_kernel, 3);
        assert_eq!(params.feather_radius, 3);
        assert_eq!(params.edge_alpha_floor, 50);
        assert_eq!(params.growth_policy, GrowthPolicy::ExploreAll);
        assert_eq!(params.border_mode, BorderMode::Skip);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_even_window_rejected() {
        let result = RemovalConfig::builder().saliency_window(8).build();
        assert!(matches!(result, Err(BgRemovalError::InvalidConfig(_))));

        let result = RemovalConfig::builder().morphology_kernel(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(RemovalConfig::builder().seed_threshold(-1.0).build().is_err());
        assert!(RemovalConfig::builder()
            .growth_threshold(f32::NAN)
            .build()
            .is_err());
        assert!(RemovalConfig::builder().growth_threshold(0.0).build().is_ok());
    }

    #[test]
    fn test_quality_clamped_by_builder() {
        let config = RemovalConfig::builder()
            .jpeg_quality(150)
            .webp_quality(200)
            .build()
            .unwrap();
        assert_eq!(config.jpeg_quality, 100);
        assert_eq!(config.webp_quality, 100);

        let mut config = RemovalConfig::default();
        config.jpeg_quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JPEG quality"));
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let config = RemovalConfig::from_json_str(
            r#"{ "params": { "feather_radius": 5, "growth_policy": "passing-only" }, "output_format": "webp" }"#,
        )
        .unwrap();
        assert_eq!(config.params.feather_radius, 5);
        assert_eq!(config.params.growth_policy, GrowthPolicy::PassingOnly);
        assert_eq!(config.params.saliency_window, 9);
        assert_eq!(config.output_format, OutputFormat::WebP);
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn test_json_invalid_values_rejected() {
        assert!(RemovalConfig::from_json_str(r#"{ "params": { "saliency_window": 4 } }"#).is_err());
        assert!(RemovalConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_policy_and_border_parsing() {
        assert_eq!(
            "passing-only".parse::<GrowthPolicy>().unwrap(),
            GrowthPolicy::PassingOnly
        );
        assert_eq!("ALL".parse::<GrowthPolicy>().unwrap(), GrowthPolicy::ExploreAll);
        assert!("sideways".parse::<GrowthPolicy>().is_err());
        assert_eq!("clamp".parse::<BorderMode>().unwrap(), BorderMode::Clamp);
        assert!("wrap".parse::<BorderMode>().is_err());
        assert_eq!(GrowthPolicy::PassingOnly.to_string(), "passing-only");
        assert_eq!(BorderMode::Skip.to_string(), "skip");
    }
}
