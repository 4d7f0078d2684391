use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use saliency_bgremove::{
    remove_background, AlphaMatteCompositor, MaskRefiner, PipelineParams, RegionSegmenter,
    RemovalConfig, SaliencyAnalyzer,
};

const SIZES: [u32; 3] = [128, 256, 512];

/// Soft-edged disc on a gradient, so every stage has real work to do
fn synthetic_portrait(size: u32) -> RgbaImage {
    let center = size as f32 / 2.0;
    let radius = size as f32 / 3.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if (dx * dx + dy * dy).sqrt() < radius {
            Rgba([220, 180, 150, 255])
        } else {
            let shade = (y * 120 / size) as u8;
            Rgba([30 + shade, 60, 90, 255])
        }
    })
}

fn benchmark_stages(c: &mut Criterion) {
    let params = PipelineParams::default();
    let mut group = c.benchmark_group("pipeline_stages");
    group.sample_size(10);

    for size in SIZES {
        let image = synthetic_portrait(size);
        let saliency = SaliencyAnalyzer::from_params(&params).compute_saliency(&image);
        let (grown, _) = RegionSegmenter::from_params(&params).segment(&saliency);
        let refined = MaskRefiner::from_params(&params).refine(&grown);

        group.bench_with_input(BenchmarkId::new("saliency", size), &image, |b, image| {
            let analyzer = SaliencyAnalyzer::from_params(&params);
            b.iter(|| black_box(analyzer.compute_saliency(image)));
        });

        group.bench_with_input(
            BenchmarkId::new("region_growing", size),
            &saliency,
            |b, saliency| {
                let segmenter = RegionSegmenter::from_params(&params);
                b.iter(|| black_box(segmenter.segment(saliency)));
            },
        );

        group.bench_with_input(BenchmarkId::new("refinement", size), &grown, |b, mask| {
            let refiner = MaskRefiner::from_params(&params);
            b.iter(|| black_box(refiner.refine(mask)));
        });

        group.bench_with_input(BenchmarkId::new("matting", size), &refined, |b, mask| {
            let compositor = AlphaMatteCompositor::from_params(&params);
            b.iter(|| {
                let mut target = image.clone();
                compositor.apply_matte(&mut target, mask).unwrap();
                black_box(target)
            });
        });
    }

    group.finish();
}

fn benchmark_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    group.sample_size(10);

    for parallel in [false, true] {
        let config = RemovalConfig::builder().parallel(parallel).build().unwrap();
        let label = if parallel { "parallel" } else { "sequential" };

        for size in SIZES {
            let image = synthetic_portrait(size);
            group.bench_with_input(BenchmarkId::new(label, size), &image, |b, image| {
                b.iter(|| black_box(remove_background(image, &config).unwrap()));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_stages, benchmark_full_pipeline);
criterion_main!(benches);
