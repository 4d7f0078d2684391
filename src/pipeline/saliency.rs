//! Local colour-contrast saliency
//!
//! The score of a pixel is the mean Euclidean RGB distance between it and
//! every cell of the surrounding `W × W` window (the centre cell included).
//! Pixels closer than `W / 2` to an edge keep a score of 0.

use crate::{
    config::PipelineParams,
    pipeline::for_each_row,
    types::SaliencyField,
};
use image::RgbaImage;
use tracing::{debug, instrument};

/// Computes a [`SaliencyField`] from an RGBA raster
#[derive(Debug, Clone, Copy)]
pub struct SaliencyAnalyzer {
    window: u32,
    parallel: bool,
}

impl Default for SaliencyAnalyzer {
    fn default() -> Self {
        Self::new(PipelineParams::default().saliency_window)
    }
}

impl SaliencyAnalyzer {
    /// `window` is the side of the square neighbourhood and should be odd
    #[must_use]
    pub fn new(window: u32) -> Self {
        Self {
            window,
            parallel: true,
        }
    }

    #[must_use]
    pub fn from_params(params: &PipelineParams) -> Self {
        Self::new(params.saliency_window)
    }

    /// Enable or disable row-parallel execution
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn window(&self) -> u32 {
        self.window
    }

    /// Score every interior pixel; alpha is ignored
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height(), window = self.window))]
    pub fn compute_saliency(&self, image: &RgbaImage) -> SaliencyField {
        let (width, height) = image.dimensions();
        let mut field = SaliencyField::zeros(width, height);

        let half = self.window / 2;
        if width < 2 * half + 1 || height < 2 * half + 1 {
            debug!("Image smaller than the saliency window, field left at zero");
            return field;
        }

        let raw = image.as_raw();
        let w = width as usize;
        let h = height as usize;
        let half = half as usize;
        let count = ((2 * half + 1) * (2 * half + 1)) as f64;

        for_each_row(field.data_mut(), w, self.parallel, |y, row| {
            if y < half || y >= h - half {
                return;
            }
            for x in half..w - half {
                let mut total = 0.0f64;
                let center = rgb_at(raw, (y * w + x) * 4);
                for ny in y - half..=y + half {
                    let base = ny * w;
                    for nx in x - half..=x + half {
                        total += color_distance(center, rgb_at(raw, (base + nx) * 4));
                    }
                }
                if let Some(cell) = row.get_mut(x) {
                    *cell = (total / count) as f32;
                }
            }
        });

        debug!(max_score = field.max_score(), "Saliency computed");
        field
    }
}

#[inline]
fn rgb_at(raw: &[u8], offset: usize) -> [i32; 3] {
    match raw.get(offset..offset + 3) {
        Some(&[r, g, b]) => [i32::from(r), i32::from(g), i32::from(b)],
        _ => [0, 0, 0],
    }
}

#[inline]
fn color_distance(a: [i32; 3], b: [i32; 3]) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    f64::from(dr * dr + dg * dg + db * db).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_images::{square, uniform};
    use image::Rgba;

    #[test]
    fn test_border_is_zero_and_dimensions_match() {
        let image = square(20, 17, 6, 5, 6);
        let field = SaliencyAnalyzer::default().compute_saliency(&image);
        assert_eq!(field.dimensions(), (20, 17));

        for y in 0..17 {
            for x in 0..20 {
                let on_border = x < 4 || x >= 16 || y < 4 || y >= 13;
                if on_border {
                    assert_eq!(field.get(x, y), Some(0.0), "border ({x}, {y})");
                }
            }
        }
        assert!(field.max_score() > 0.0);
    }

    #[test]
    fn test_uniform_image_has_zero_saliency() {
        let image = uniform(32, 24, [120, 40, 200, 255]);
        let field = SaliencyAnalyzer::default().compute_saliency(&image);
        assert!(field.data().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_small_image_yields_zero_field() {
        let image = square(8, 30, 2, 2, 3);
        let field = SaliencyAnalyzer::new(9).compute_saliency(&image);
        assert_eq!(field.dimensions(), (8, 30));
        assert!(field.data().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_single_bright_pixel_score() {
        let mut image = uniform(9, 9, [0, 0, 0, 255]);
        image.put_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let field = SaliencyAnalyzer::new(9).compute_saliency(&image);
        // 80 of the 81 window cells differ from the centre by 255
        let expected = (80.0 * 255.0 / 81.0) as f32;
        assert!((field.get(4, 4).unwrap() - expected).abs() < 1e-3);
        assert_eq!(field.get(3, 4), Some(0.0));
    }

    #[test]
    fn test_alpha_is_ignored() {
        let opaque = square(16, 16, 5, 5, 6);
        let mut translucent = opaque.clone();
        for pixel in translucent.pixels_mut() {
            pixel.0[3] = 7;
        }
        let analyzer = SaliencyAnalyzer::new(5);
        assert_eq!(
            analyzer.compute_saliency(&opaque),
            analyzer.compute_saliency(&translucent)
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let image = square(40, 33, 9, 7, 15);
        let seq = SaliencyAnalyzer::new(9)
            .with_parallel(false)
            .compute_saliency(&image);
        let par = SaliencyAnalyzer::new(9)
            .with_parallel(true)
            .compute_saliency(&image);
        assert_eq!(seq, par);
    }
}
