//! Edge-aware alpha matting
//!
//! Interior foreground becomes fully opaque, background fully transparent, and
//! foreground pixels within the feather radius of the boundary get an alpha
//! equal to the local foreground coverage, never below the edge floor.

use crate::{
    config::PipelineParams,
    error::{BgRemovalError, Result},
    pipeline::for_each_row,
    types::{SegmentationMask, BACKGROUND, FOREGROUND},
};
use image::RgbaImage;
use tracing::instrument;

/// Writes a feathered alpha channel derived from a mask
#[derive(Debug, Clone, Copy)]
pub struct AlphaMatteCompositor {
    feather_radius: u32,
    alpha_floor: u8,
    parallel: bool,
}

impl Default for AlphaMatteCompositor {
    fn default() -> Self {
        Self::from_params(&PipelineParams::default())
    }
}

impl AlphaMatteCompositor {
    #[must_use]
    pub fn new(feather_radius: u32, alpha_floor: u8) -> Self {
        Self {
            feather_radius,
            alpha_floor,
            parallel: true,
        }
    }

    #[must_use]
    pub fn from_params(params: &PipelineParams) -> Self {
        Self::new(params.feather_radius, params.edge_alpha_floor)
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Rewrite the alpha channel of `image` in place
    ///
    /// Pixels within `feather_radius` of an edge keep their original alpha.
    /// Mask values other than 0 and 255 leave alpha untouched.
    ///
    /// # Errors
    /// Returns `BgRemovalError::DimensionMismatch` if the mask and image sizes differ
    #[instrument(skip(self, image, mask), fields(width = image.width(), height = image.height(), feather = self.feather_radius))]
    pub fn apply_matte(&self, image: &mut RgbaImage, mask: &SegmentationMask) -> Result<()> {
        let (width, height) = image.dimensions();
        if mask.dimensions != (width, height) {
            return Err(BgRemovalError::dimension_mismatch(
                (width, height),
                mask.dimensions,
            ));
        }

        let w = width as usize;
        let h = height as usize;
        let f = self.feather_radius as usize;
        if w < 2 * f + 1 || h < 2 * f + 1 {
            return Ok(());
        }

        let window_count = ((2 * f + 1) * (2 * f + 1)) as u32;
        let floor = self.alpha_floor;
        let mask_data = &mask.data;
        let raw: &mut [u8] = image;

        for_each_row(raw, w * 4, self.parallel, |y, row| {
            if y < f || y >= h - f {
                return;
            }
            for x in f..w - f {
                let alpha = match mask_data.get(y * w + x).copied() {
                    Some(BACKGROUND) => BACKGROUND,
                    Some(FOREGROUND) => {
                        let mut sum = 0u32;
                        let mut touches_background = false;
                        for ny in y - f..=y + f {
                            let base = ny * w;
                            for nx in x - f..=x + f {
                                let v = mask_data.get(base + nx).copied().unwrap_or(BACKGROUND);
                                sum += u32::from(v);
                                touches_background |= v == BACKGROUND;
                            }
                        }
                        if touches_background {
                            let coverage = (f64::from(sum) / f64::from(window_count)).round() as u8;
                            coverage.max(floor)
                        } else {
                            FOREGROUND
                        }
                    },
                    _ => continue,
                };
                if let Some(a) = row.get_mut(x * 4 + 3) {
                    *a = alpha;
                }
            }
        });

        Ok(())
    }

    /// Set every alpha value to 0, used when the image has no analysable interior
    pub fn clear_alpha(image: &mut RgbaImage) {
        for pixel in image.pixels_mut() {
            pixel.0[3] = 0;
        }
    }
}
