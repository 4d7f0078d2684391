//! Morphological mask refinement: a max-filter pass followed by a min-filter pass

use crate::{
    config::{BorderMode, PipelineParams},
    pipeline::for_each_row,
    types::SegmentationMask,
};
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Max,
    Min,
}

/// Fills small holes and removes isolated speckles from a binary mask
#[derive(Debug, Clone, Copy)]
pub struct MaskRefiner {
    kernel: u32,
    border_mode: BorderMode,
    parallel: bool,
}

impl Default for MaskRefiner {
    fn default() -> Self {
        Self::from_params(&PipelineParams::default())
    }
}

impl MaskRefiner {
    #[must_use]
    pub fn new(kernel: u32, border_mode: BorderMode) -> Self {
        Self {
            kernel,
            border_mode,
            parallel: true,
        }
    }

    #[must_use]
    pub fn from_params(params: &PipelineParams) -> Self {
        Self::new(params.morphology_kernel, params.border_mode)
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Closing pass (max filter) then opening pass (min filter)
    ///
    /// With [`BorderMode::Skip`] only pixels with a full `K × K` window are
    /// written in either pass, and the second pass reads the zeros left in
    /// the first pass's border.
    #[instrument(skip(self, mask), fields(width = mask.dimensions.0, height = mask.dimensions.1, kernel = self.kernel))]
    pub fn refine(&self, mask: &SegmentationMask) -> SegmentationMask {
        let closed = self.filter(mask, Extremum::Max);
        self.filter(&closed, Extremum::Min)
    }

    fn filter(&self, mask: &SegmentationMask, op: Extremum) -> SegmentationMask {
        let (width, height) = mask.dimensions;
        let mut out = SegmentationMask::empty(width, height);
        let w = width as usize;
        let h = height as usize;
        let half = (self.kernel / 2) as usize;
        let src = &mask.data;
        let border_mode = self.border_mode;

        for_each_row(&mut out.data, w, self.parallel, |y, row| {
            let (x_range, rows) = match border_mode {
                BorderMode::Skip => {
                    if y < half || y + half >= h || w < 2 * half + 1 {
                        return;
                    }
                    (half..w - half, (y - half)..=(y + half))
                },
                BorderMode::Clamp => (
                    0..w,
                    y.saturating_sub(half)..=(y + half).min(h - 1),
                ),
            };

            for x in x_range {
                let cols = x.saturating_sub(half)..=(x + half).min(w - 1);
                let mut acc = match op {
                    Extremum::Max => u8::MIN,
                    Extremum::Min => u8::MAX,
                };
                for ny in rows.clone() {
                    let base = ny * w;
                    for nx in cols.clone() {
                        let v = src.get(base + nx).copied().unwrap_or(0);
                        acc = match op {
                            Extremum::Max => acc.max(v),
                            Extremum::Min => acc.min(v),
                        };
                    }
                }
                if let Some(cell) = row.get_mut(x) {
                    *cell = acc;
                }
            }
        });

        out
    }
}
