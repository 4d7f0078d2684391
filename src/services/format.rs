//! Output format handling

use crate::{
    config::OutputFormat,
    error::{BgRemovalError, Result},
};
use image::{DynamicImage, RgbaImage};
use std::path::Path;

/// Converts matted rasters into the layout each output format expects
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Convert the matted RGBA raster for `format`
    ///
    /// JPEG drops the alpha channel; every other format keeps RGBA8.
    ///
    /// # Examples
    /// ```rust
    /// use saliency_bgremove::{services::OutputFormatHandler, OutputFormat};
    /// use image::RgbaImage;
    ///
    /// let converted = OutputFormatHandler::convert_format(RgbaImage::new(4, 4), OutputFormat::Jpeg)?;
    /// assert!(converted.as_rgb8().is_some());
    /// # Ok::<(), saliency_bgremove::BgRemovalError>(())
    /// ```
    pub fn convert_format(rgba_image: RgbaImage, format: OutputFormat) -> Result<DynamicImage> {
        let image = DynamicImage::ImageRgba8(rgba_image);
        match format {
            OutputFormat::Png | OutputFormat::WebP | OutputFormat::Tiff | OutputFormat::Rgba8 => {
                Ok(image)
            },
            OutputFormat::Jpeg => Ok(DynamicImage::ImageRgb8(image.to_rgb8())),
        }
    }

    /// File extension (without the dot) for `format`
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Rgba8 => "raw",
        }
    }

    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        !matches!(format, OutputFormat::Jpeg)
    }

    /// Warn when the chosen format cannot carry the matte
    pub fn validate_for_background_removal(format: OutputFormat) {
        if !Self::supports_transparency(format) {
            log::warn!(
                "Output format {:?} has no alpha channel; the removed background will be flattened",
                format
            );
        }
    }

    /// Parse a user-facing format name
    ///
    /// # Errors
    /// Returns `BgRemovalError::UnsupportedFormat` for unknown names
    pub fn parse(name: &str) -> Result<OutputFormat> {
        match name.to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::WebP),
            "tif" | "tiff" => Ok(OutputFormat::Tiff),
            "rgba8" | "raw" => Ok(OutputFormat::Rgba8),
            other => Err(BgRemovalError::unsupported_format(other)),
        }
    }

    /// Infer the output format from a path's extension, if it names one
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<OutputFormat> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| Self::parse(ext).ok())
    }
}
