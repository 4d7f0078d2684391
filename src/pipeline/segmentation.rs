//! Seeded region growing over a saliency field

use crate::{
    config::{GrowthPolicy, PipelineParams},
    types::{Centroid, SaliencyField, SegmentationMask, FOREGROUND},
};
use tracing::{debug, instrument};

/// 8-connected neighbourhood in row-major order
const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Turns a saliency field into a binary foreground mask
#[derive(Debug, Clone, Copy)]
pub struct RegionSegmenter {
    seed_threshold: f32,
    growth_threshold: f32,
    policy: GrowthPolicy,
}

impl Default for RegionSegmenter {
    fn default() -> Self {
        Self::from_params(&PipelineParams::default())
    }
}

impl RegionSegmenter {
    #[must_use]
    pub fn new(seed_threshold: f32, growth_threshold: f32, policy: GrowthPolicy) -> Self {
        Self {
            seed_threshold,
            growth_threshold,
            policy,
        }
    }

    #[must_use]
    pub fn from_params(params: &PipelineParams) -> Self {
        Self::new(
            params.seed_threshold,
            params.growth_threshold,
            params.growth_policy,
        )
    }

    /// Saliency-weighted centre of mass of every pixel scoring above the seed
    /// threshold. Falls back to the geometric centre when no pixel qualifies.
    #[must_use]
    pub fn find_centroid(&self, saliency: &SaliencyField) -> Centroid {
        let (width, height) = saliency.dimensions();

        let mut total = 0.0f64;
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;

        for (idx, &score) in saliency.data().iter().enumerate() {
            if score > self.seed_threshold {
                let weight = f64::from(score);
                let x = (idx % width as usize) as f64;
                let y = (idx / width as usize) as f64;
                total += weight;
                sum_x += x * weight;
                sum_y += y * weight;
            }
        }

        if total > 0.0 {
            let x = (sum_x / total).round() as u32;
            let y = (sum_y / total).round() as u32;
            Centroid::weighted(x.min(width - 1), y.min(height - 1))
        } else {
            Centroid::geometric_center(width, height)
        }
    }

    /// Grow a mask from the saliency-weighted centroid
    ///
    /// Returns the mask together with the seed it was grown from.
    #[instrument(skip(self, saliency), fields(width = saliency.dimensions().0, height = saliency.dimensions().1, policy = %self.policy))]
    pub fn segment(&self, saliency: &SaliencyField) -> (SegmentationMask, Centroid) {
        let (width, height) = saliency.dimensions();
        if width == 0 || height == 0 {
            return (
                SegmentationMask::empty(width, height),
                Centroid::geometric_center(width, height),
            );
        }

        let centroid = self.find_centroid(saliency);
        debug!(
            x = centroid.x,
            y = centroid.y,
            fallback = centroid.is_fallback,
            "Seed selected"
        );

        let mask = self.grow_from(saliency, centroid);
        (mask, centroid)
    }

    /// Explicit-stack flood fill from `seed`
    ///
    /// A pixel is marked visited when it is first pushed, so every pixel is
    /// evaluated at most once and the stack never holds more than
    /// `width * height` entries.
    #[must_use]
    pub fn grow_from(&self, saliency: &SaliencyField, seed: Centroid) -> SegmentationMask {
        let (width, height) = saliency.dimensions();
        let mut mask = SegmentationMask::empty(width, height);
        if seed.x >= width || seed.y >= height {
            return mask;
        }

        let w = width as usize;
        let scores = saliency.data();
        let mut visited = vec![false; scores.len()];
        let mut stack: Vec<usize> = Vec::with_capacity(1024);

        let seed_idx = seed.y as usize * w + seed.x as usize;
        if let Some(flag) = visited.get_mut(seed_idx) {
            *flag = true;
        }
        stack.push(seed_idx);

        let mut grown = 0usize;
        let mut evaluated = 0usize;

        while let Some(idx) = stack.pop() {
            evaluated += 1;
            let score = scores.get(idx).copied().unwrap_or(0.0);
            let passes = score > self.growth_threshold;

            if passes {
                if let Some(cell) = mask.data.get_mut(idx) {
                    *cell = FOREGROUND;
                }
                grown += 1;
            }

            if !passes && self.policy == GrowthPolicy::PassingOnly {
                continue;
            }

            let x = (idx % w) as i64;
            let y = (idx / w) as i64;
            for (dx, dy) in NEIGHBOURS {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
                    continue;
                }
                let nidx = ny as usize * w + nx as usize;
                if let Some(flag) = visited.get_mut(nidx) {
                    if !*flag {
                        *flag = true;
                        stack.push(nidx);
                    }
                }
            }
        }

        debug!(evaluated, grown, "Region growing finished");
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BACKGROUND;

    fn field_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> SaliencyField {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        SaliencyField::new(data, (width, height)).unwrap()
    }

    #[test]
    fn test_zero_field_gives_empty_mask_and_fallback_seed() {
        let field = SaliencyField::zeros(11, 7);
        let (mask, centroid) = RegionSegmenter::default().segment(&field);
        assert!(mask.data.iter().all(|&v| v == BACKGROUND));
        assert!(centroid.is_fallback);
        assert_eq!((centroid.x, centroid.y), (5, 3));
    }

    #[test]
    fn test_centroid_is_weighted_by_saliency() {
        // Two salient pixels, the right one twice as strong
        let field = field_from_fn(10, 3, |x, y| match (x, y) {
            (1, 1) => 100.0,
            (7, 1) => 200.0,
            (4, 1) => 40.0, // below the seed threshold, ignored
            _ => 0.0,
        });
        let centroid = RegionSegmenter::default().find_centroid(&field);
        assert!(!centroid.is_fallback);
        assert_eq!((centroid.x, centroid.y), (5, 1));
    }

    #[test]
    fn test_explore_all_reaches_disconnected_regions() {
        // Two salient blobs separated by a zero-saliency gap
        let field = field_from_fn(12, 5, |x, _| if x <= 2 || x >= 9 { 60.0 } else { 0.0 });
        let (mask, _) = RegionSegmenter::default().segment(&field);
        for y in 0..5 {
            for x in 0..12 {
                let expected = if x <= 2 || x >= 9 { 255 } else { 0 };
                assert_eq!(mask.get(x, y), Some(expected), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_passing_only_stops_at_low_saliency() {
        let field = field_from_fn(12, 5, |x, _| if x <= 2 || x >= 9 { 60.0 } else { 0.0 });
        let segmenter = RegionSegmenter::new(50.0, 30.0, GrowthPolicy::PassingOnly);
        let mask = segmenter.grow_from(&field, Centroid::weighted(0, 2));
        assert_eq!(mask.get(1, 1), Some(255));
        assert_eq!(mask.get(9, 1), Some(0));
        assert_eq!(mask.statistics().foreground_pixels, 15);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let field = field_from_fn(3, 3, |x, _| if x == 0 { 30.0 } else { 30.5 });
        let (mask, _) = RegionSegmenter::default().segment(&field);
        assert_eq!(mask.get(0, 0), Some(0));
        assert_eq!(mask.get(1, 0), Some(255));
    }

    #[test]
    fn test_mask_is_binary() {
        let field = field_from_fn(20, 20, |x, y| ((x * 7 + y * 13) % 61) as f32);
        let (mask, _) = RegionSegmenter::default().segment(&field);
        assert!(mask.is_binary());
    }

    #[test]
    fn test_empty_field() {
        let field = SaliencyField::zeros(0, 5);
        let (mask, _) = RegionSegmenter::default().segment(&field);
        assert!(mask.data.is_empty());
    }
}
