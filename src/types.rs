//! Core types for background removal operations

use crate::{
    config::{OutputFormat, PipelineParams},
    error::{BgRemovalError, Result},
};
use image::{DynamicImage, GenericImageView, GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mask value for background pixels
pub const BACKGROUND: u8 = 0;

/// Mask value for foreground pixels
pub const FOREGROUND: u8 = 255;

/// Per-pixel saliency scores, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyField {
    data: Vec<f32>,
    dimensions: (u32, u32),
}

impl SaliencyField {
    /// Wrap existing scores
    ///
    /// # Errors
    /// Returns `BgRemovalError::Processing` if `data.len() != width * height`
    pub fn new(data: Vec<f32>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(BgRemovalError::processing(format!(
                "Saliency data length {} does not match {}x{}",
                data.len(),
                dimensions.0,
                dimensions.1
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// All-zero field
    #[must_use]
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            data: vec![0.0; width as usize * height as usize],
            dimensions: (width, height),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Score at `(x, y)`, or `None` when out of bounds
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        let (width, height) = self.dimensions;
        if x >= width || y >= height {
            return None;
        }
        self.data
            .get(y as usize * width as usize + x as usize)
            .copied()
    }

    /// Highest score in the field (0 for empty fields)
    #[must_use]
    pub fn max_score(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Render the field as a grayscale image scaled so the maximum maps to 255
    #[must_use]
    pub fn to_image(&self) -> GrayImage {
        let (width, height) = self.dimensions;
        let max = self.max_score();
        let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
        ImageBuffer::from_fn(width, height, |x, y| {
            let score = self.get(x, y).unwrap_or(0.0);
            Luma([(score * scale).round().clamp(0.0, 255.0) as u8])
        })
    }
}

/// Seed point for region growing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: u32,
    pub y: u32,
    /// True when no pixel exceeded the seed threshold and the geometric
    /// centre was used instead
    pub is_fallback: bool,
}

impl Centroid {
    /// Saliency-weighted centroid
    #[must_use]
    pub fn weighted(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            is_fallback: false,
        }
    }

    /// Geometric centre of a `width × height` image
    #[must_use]
    pub fn geometric_center(width: u32, height: u32) -> Self {
        Self {
            x: width / 2,
            y: height / 2,
            is_fallback: true,
        }
    }
}

/// Binary segmentation mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Mask data, one byte per pixel (0 = background, 255 = foreground)
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// All-background mask
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(
            vec![BACKGROUND; width as usize * height as usize],
            (width, height),
        )
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.as_raw().clone(), (width, height))
    }

    /// Convert mask to a grayscale image
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        ImageBuffer::from_raw(width, height, self.data.clone())
            .ok_or_else(|| BgRemovalError::processing("Failed to create image from mask data"))
    }

    /// Value at `(x, y)`, or `None` when out of bounds
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        let (width, height) = self.dimensions;
        if x >= width || y >= height {
            return None;
        }
        self.data
            .get(y as usize * width as usize + x as usize)
            .copied()
    }

    /// True when every value is either background or foreground
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.data
            .iter()
            .all(|&v| v == BACKGROUND || v == FOREGROUND)
    }

    /// Resize with nearest-neighbour sampling so binary masks stay binary
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<SegmentationMask> {
        let current_image = self.to_image()?;
        let resized = image::imageops::resize(
            &current_image,
            new_width,
            new_height,
            image::imageops::FilterType::Nearest,
        );

        Ok(SegmentationMask::from_image(&resized))
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.data.iter().filter(|&&x| x > 127).count();
        let background_pixels = total_pixels - foreground_pixels;
        let ratio = |count: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                count as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: ratio(foreground_pixels),
            background_ratio: ratio(background_pixels),
        }
    }

    /// Save mask as PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image = self.to_image()?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Timing breakdown per pipeline stage, in milliseconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image loading and decoding
    pub image_decode_ms: u64,
    /// Saliency analysis
    pub saliency_ms: u64,
    /// Centroid search and region growing
    pub segmentation_ms: u64,
    /// Morphological refinement
    pub refinement_ms: u64,
    /// Alpha matting
    pub matting_ms: u64,
    /// Final image encoding (if saved or encoded)
    pub image_encode_ms: Option<u64>,
    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the measured stage timings
    #[must_use]
    pub fn measured_ms(&self) -> u64 {
        self.image_decode_ms
            + self.saliency_ms
            + self.segmentation_ms
            + self.refinement_ms
            + self.matting_ms
            + self.image_encode_ms.unwrap_or(0)
    }

    /// Time not attributed to any stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        self.total_ms.saturating_sub(self.measured_ms())
    }

    /// Share of the total spent in saliency analysis
    #[must_use]
    pub fn saliency_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.saliency_ms as f64 / self.total_ms as f64
        }
    }
}

/// Metadata about the processing operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Detailed timing breakdown
    pub timings: ProcessingTimings,

    /// Parameters the pipeline ran with
    pub params: PipelineParams,

    /// Seed used for region growing
    pub centroid: Option<Centroid>,

    /// Output image format
    pub output_format: OutputFormat,

    /// True when the image was too small to analyse and was cleared
    pub degraded: bool,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(params: PipelineParams, output_format: OutputFormat) -> Self {
        Self {
            timings: ProcessingTimings::new(),
            params,
            centroid: None,
            output_format,
            degraded: false,
        }
    }
}

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// The processed image with background removed
    pub image: DynamicImage,

    /// The refined mask the matte was built from
    pub mask: SegmentationMask,

    /// Original image dimensions
    pub original_dimensions: (u32, u32),

    /// Processing metadata
    pub metadata: ProcessingMetadata,

    /// Original input path (for logging purposes)
    pub input_path: Option<String>,
}

impl RemovalResult {
    /// Create a new removal result
    #[must_use]
    pub fn new(
        image: DynamicImage,
        mask: SegmentationMask,
        original_dimensions: (u32, u32),
        metadata: ProcessingMetadata,
    ) -> Self {
        Self {
            image,
            mask,
            original_dimensions,
            metadata,
            input_path: None,
        }
    }

    /// Save the result as PNG with alpha channel
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    /// Save the result as JPEG, dropping the alpha channel
    pub fn save_jpeg<P: AsRef<Path>>(&self, path: P, quality: u8) -> Result<()> {
        let bytes = self.to_bytes(OutputFormat::Jpeg, quality)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Save in the specified format, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P, format: OutputFormat, quality: u8) -> Result<()> {
        crate::services::ImageIOService::save_image(&self.image, path, format, quality)
    }

    /// Save and record the encoding time in the metadata
    pub fn save_with_timing<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let encode_start = instant::Instant::now();
        self.save(&path, format, quality)?;
        let encode_ms = encode_start.elapsed().as_millis() as u64;
        self.metadata.timings.image_encode_ms = Some(encode_ms);

        tracing::info!(
            input = %self.input_path.as_deref().unwrap_or("input"),
            output = %path.as_ref().display(),
            encode_ms,
            "Saved result"
        );
        Ok(())
    }

    /// Get the image as raw RGBA bytes
    #[must_use]
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.image.to_rgba8().into_raw()
    }

    /// Get the image as encoded bytes in the specified format
    pub fn to_bytes(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        match format {
            OutputFormat::Png => {
                self.image.write_to(&mut cursor, image::ImageFormat::Png)?;
            },
            OutputFormat::Jpeg => {
                let rgb_image = self.image.to_rgb8();
                let mut jpeg_encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
                jpeg_encoder.encode_image(&rgb_image)?;
            },
            OutputFormat::WebP => {
                let rgba = DynamicImage::ImageRgba8(self.image.to_rgba8());
                rgba.write_to(&mut cursor, image::ImageFormat::WebP)?;
            },
            OutputFormat::Tiff => {
                self.image.write_to(&mut cursor, image::ImageFormat::Tiff)?;
            },
            OutputFormat::Rgba8 => return Ok(self.to_rgba_bytes()),
        }
        Ok(buffer)
    }

    /// Get image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Get detailed timing breakdown
    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// One-line timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let mut summary = format!(
            "Total: {}ms | Saliency: {}ms | Segmentation: {}ms | Refinement: {}ms | Matting: {}ms",
            t.total_ms, t.saliency_ms, t.segmentation_ms, t.refinement_ms, t.matting_ms
        );

        if t.image_decode_ms > 0 {
            summary.push_str(&format!(" | Decode: {}ms", t.image_decode_ms));
        }
        if let Some(encode_ms) = t.image_encode_ms {
            summary.push_str(&format!(" | Encode: {}ms", encode_ms));
        }

        summary
    }
}
