//! Classical segmentation stages
//!
//! Each stage is a small value type holding its parameters. Stages never share
//! scratch buffers: everything they allocate lives for one call.

pub mod matte;
pub mod refine;
pub mod saliency;
pub mod segmentation;

pub use matte::AlphaMatteCompositor;
pub use refine::MaskRefiner;
pub use saliency::SaliencyAnalyzer;
pub use segmentation::RegionSegmenter;

/// Run `f(row_index, row)` over every `stride`-sized row of `data`.
///
/// Rows are independent, so the parallel path produces the same bytes as the
/// sequential one.
#[cfg(feature = "parallel")]
pub(crate) fn for_each_row<T, F>(data: &mut [T], stride: usize, parallel: bool, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    use rayon::prelude::*;

    if stride == 0 {
        return;
    }

    if parallel {
        data.par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    } else {
        data.chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn for_each_row<T, F>(data: &mut [T], stride: usize, _parallel: bool, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if stride == 0 {
        return;
    }

    data.chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}
