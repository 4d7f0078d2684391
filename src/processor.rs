//! Background removal processor
//!
//! `BackgroundRemovalProcessor` sequences the pipeline stages, records
//! per-stage timings and reports progress. Both the library free functions
//! and the CLI go through it so they behave identically.

use crate::{
    config::{BorderMode, GrowthPolicy, OutputFormat, PipelineParams, RemovalConfig},
    error::Result,
    pipeline::{AlphaMatteCompositor, MaskRefiner, RegionSegmenter, SaliencyAnalyzer},
    services::{
        ImageIOService, OutputFormatHandler, ProcessingStage, ProgressReporter, ProgressTracker,
    },
    types::{Centroid, ProcessingMetadata, ProcessingTimings, RemovalResult, SegmentationMask},
};
use image::{DynamicImage, GenericImageView, RgbaImage};
use instant::Instant;
use log::{debug, info};
use std::path::Path;
use tracing::{info as trace_info, instrument, span, Level};

/// Configuration for the background removal processor
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Segmentation pipeline parameters
    pub params: PipelineParams,
    /// Output format configuration
    pub output_format: OutputFormat,
    /// JPEG quality (0-100)
    pub jpeg_quality: u8,
    /// WebP quality (0-100)
    pub webp_quality: u8,
    /// Split per-row work across threads
    pub parallel: bool,
    /// Enable debug mode
    pub debug: bool,
    /// Enable verbose progress reporting
    pub verbose_progress: bool,
}

impl ProcessorConfig {
    #[must_use]
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }

    /// Encoder quality for the configured output format
    #[must_use]
    pub fn output_quality(&self) -> u8 {
        match self.output_format {
            OutputFormat::WebP => self.webp_quality,
            _ => self.jpeg_quality,
        }
    }

    #[must_use]
    pub fn to_removal_config(&self) -> RemovalConfig {
        RemovalConfig {
            params: self.params.clone(),
            output_format: self.output_format,
            jpeg_quality: self.jpeg_quality,
            webp_quality: self.webp_quality,
            parallel: self.parallel,
            debug: self.debug,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::from(&RemovalConfig::default())
    }
}

impl From<&RemovalConfig> for ProcessorConfig {
    fn from(config: &RemovalConfig) -> Self {
        Self {
            params: config.params.clone(),
            output_format: config.output_format,
            jpeg_quality: config.jpeg_quality,
            webp_quality: config.webp_quality,
            parallel: config.parallel,
            debug: config.debug,
            verbose_progress: false,
        }
    }
}

/// Builder for `ProcessorConfig`
#[derive(Debug)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::default(),
        }
    }

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

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(0, 100);
        self
    }

    #[must_use]
    pub fn webp_quality(mut self, quality: u8) -> Self {
        self.config.webp_quality = quality.clamp(0, 100);
        self
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    #[must_use]
    pub fn verbose_progress(mut self, verbose: bool) -> Self {
        self.config.verbose_progress = verbose;
        self
    }

    /// Build the processor configuration
    ///
    /// # Errors
    /// Returns `BgRemovalError::InvalidConfig` for out-of-range parameters
    pub fn build(self) -> Result<ProcessorConfig> {
        self.config.to_removal_config().validate()?;
        Ok(self.config)
    }
}

impl Default for ProcessorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the saliency → region growing → refinement → matting pipeline
pub struct BackgroundRemovalProcessor {
    config: ProcessorConfig,
    progress_tracker: Option<ProgressTracker>,
}

impl BackgroundRemovalProcessor {
    /// Create a processor, validating the configuration
    ///
    /// # Errors
    /// Returns `BgRemovalError::InvalidConfig` for out-of-range parameters
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        config.to_removal_config().validate()?;
        let progress_tracker = config
            .verbose_progress
            .then(|| ProgressTracker::console(config.debug));
        Ok(Self {
            config,
            progress_tracker,
        })
    }

    /// Route progress reports to `reporter`
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.progress_tracker = Some(ProgressTracker::new(reporter));
        self
    }

    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process a decoded image
    ///
    /// # Errors
    /// Returns `BgRemovalError` if a pipeline stage or format conversion fails
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        let total_start = Instant::now();
        self.start_run();
        self.run(image.to_rgba8(), ProcessingTimings::default(), total_start)
    }

    /// Process an image and remember where it came from for logging
    ///
    /// # Errors
    /// Returns `BgRemovalError` if a pipeline stage or format conversion fails
    pub fn process_image_with_path(
        &mut self,
        image: &DynamicImage,
        input_path: &str,
    ) -> Result<RemovalResult> {
        let mut result = self.process_image(image)?;
        result.input_path = Some(input_path.to_string());
        Ok(result)
    }

    /// Decode encoded image bytes and process them
    ///
    /// # Errors
    /// - `BgRemovalError::Decode` when the bytes are not a decodable image
    /// - Any pipeline error from [`Self::process_image`]
    pub fn process_bytes(&mut self, image_bytes: &[u8]) -> Result<RemovalResult> {
        let total_start = Instant::now();
        self.start_run();
        self.report_stage(ProcessingStage::ImageLoading);

        let decode_start = Instant::now();
        let image = self.track_error(ImageIOService::load_from_bytes(image_bytes))?;
        let timings = ProcessingTimings {
            image_decode_ms: decode_start.elapsed().as_millis() as u64,
            ..ProcessingTimings::default()
        };

        self.run(image.to_rgba8(), timings, total_start)
    }

    /// Load an image file and process it
    ///
    /// # Errors
    /// - `BgRemovalError::Io` / `BgRemovalError::Decode` when loading fails
    /// - Any pipeline error from [`Self::process_image`]
    pub fn process_file<P: AsRef<Path>>(&mut self, input_path: P) -> Result<RemovalResult> {
        let input_path_ref = input_path.as_ref();
        let total_start = Instant::now();
        self.start_run();
        self.report_stage(ProcessingStage::ImageLoading);

        let decode_start = Instant::now();
        let image = self.track_error(ImageIOService::load_image(input_path_ref))?;
        let timings = ProcessingTimings {
            image_decode_ms: decode_start.elapsed().as_millis() as u64,
            ..ProcessingTimings::default()
        };

        let mut result = self.run(image.to_rgba8(), timings, total_start)?;
        result.input_path = Some(input_path_ref.display().to_string());
        Ok(result)
    }

    /// Read an image from an async stream and process it
    ///
    /// Only the read is awaited; the pipeline itself runs synchronously.
    ///
    /// # Errors
    /// - `BgRemovalError::Io` when reading the stream fails
    /// - `BgRemovalError::Decode` when the data is not an image
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &mut self,
        reader: R,
    ) -> Result<RemovalResult> {
        let total_start = Instant::now();
        self.start_run();
        self.report_stage(ProcessingStage::ImageLoading);

        let decode_start = Instant::now();
        let image = self.track_error(ImageIOService::load_from_reader(reader).await)?;
        let timings = ProcessingTimings {
            image_decode_ms: decode_start.elapsed().as_millis() as u64,
            ..ProcessingTimings::default()
        };

        self.run(image.to_rgba8(), timings, total_start)
    }

    /// Write `result` to `path` in the configured format
    ///
    /// Reports the file-saving stage and records the encode time in
    /// `result.metadata.timings`.
    ///
    /// # Errors
    /// Returns `BgRemovalError::Io` or `BgRemovalError::Image` when encoding or writing fails
    pub fn save_result<P: AsRef<Path>>(
        &mut self,
        result: &mut RemovalResult,
        path: P,
    ) -> Result<()> {
        self.report_stage(ProcessingStage::FileSaving);
        let saved = result.save_with_timing(
            path,
            self.config.output_format,
            self.config.output_quality(),
        );
        self.track_error(saved)
    }

    /// Run saliency, region growing and refinement only
    ///
    /// Images smaller than the saliency window yield an all-background mask.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for parity with the other entry points
    pub fn segment_foreground(&mut self, image: &DynamicImage) -> Result<SegmentationMask> {
        self.start_run();
        let rgba = image.to_rgba8();
        if self.is_too_small(&rgba) {
            let (width, height) = rgba.dimensions();
            return Ok(SegmentationMask::empty(width, height));
        }
        let mut timings = ProcessingTimings::default();
        let (mask, _) = self.compute_mask(&rgba, &mut timings);
        debug!(
            "Mask computed in {}ms",
            timings.saliency_ms + timings.segmentation_ms + timings.refinement_ms
        );
        Ok(mask)
    }

    /// Matte `image` with a caller-supplied mask
    ///
    /// A mask of a different size is resized with nearest-neighbour sampling
    /// so its values stay binary.
    ///
    /// # Errors
    /// Returns `BgRemovalError` if resizing or format conversion fails
    pub fn apply_mask(
        &self,
        image: &DynamicImage,
        mask: &SegmentationMask,
    ) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let original_dimensions = image.dimensions();

        let resized_mask = if mask.dimensions == original_dimensions {
            mask.clone()
        } else {
            debug!(
                "Resizing mask from {:?} to {:?}",
                mask.dimensions, original_dimensions
            );
            mask.resize(original_dimensions.0, original_dimensions.1)?
        };

        let mut rgba = image.to_rgba8();
        let matting_start = Instant::now();
        self.compositor().apply_matte(&mut rgba, &resized_mask)?;

        let mut metadata =
            ProcessingMetadata::new(self.config.params.clone(), self.config.output_format);
        metadata.timings.matting_ms = matting_start.elapsed().as_millis() as u64;

        let final_image = OutputFormatHandler::convert_format(rgba, self.config.output_format)?;
        metadata.timings.total_ms = total_start.elapsed().as_millis() as u64;

        Ok(RemovalResult::new(
            final_image,
            resized_mask,
            original_dimensions,
            metadata,
        ))
    }

    #[instrument(
        skip(self, rgba, timings, total_start),
        fields(
            dimensions = %format!("{}x{}", rgba.width(), rgba.height()),
            policy = %self.config.params.growth_policy
        )
    )]
    fn run(
        &mut self,
        rgba: RgbaImage,
        timings: ProcessingTimings,
        total_start: Instant,
    ) -> Result<RemovalResult> {
        let result = self.run_stages(rgba, timings, total_start);
        if let Err(ref e) = result {
            if let Some(ref tracker) = self.progress_tracker {
                tracker.report_error(&e.to_string());
            }
        }
        result
    }

    fn run_stages(
        &mut self,
        mut rgba: RgbaImage,
        mut timings: ProcessingTimings,
        total_start: Instant,
    ) -> Result<RemovalResult> {
        let original_dimensions = rgba.dimensions();
        let mut metadata =
            ProcessingMetadata::new(self.config.params.clone(), self.config.output_format);

        trace_info!(
            width = original_dimensions.0,
            height = original_dimensions.1,
            "Starting background removal"
        );

        let mask = if self.is_too_small(&rgba) {
            info!(
                "Image {}x{} is smaller than the {}px saliency window, clearing alpha",
                original_dimensions.0, original_dimensions.1, self.config.params.saliency_window
            );
            AlphaMatteCompositor::clear_alpha(&mut rgba);
            metadata.degraded = true;
            SegmentationMask::empty(original_dimensions.0, original_dimensions.1)
        } else {
            let (mask, centroid) = self.compute_mask(&rgba, &mut timings);
            metadata.centroid = Some(centroid);

            self.report_stage(ProcessingStage::AlphaMatting);
            let matting_start = Instant::now();
            {
                let _span = span!(
                    Level::DEBUG,
                    "alpha_matting",
                    feather = self.config.params.feather_radius,
                    floor = self.config.params.edge_alpha_floor
                )
                .entered();
                self.compositor().apply_matte(&mut rgba, &mask)?;
            }
            timings.matting_ms = matting_start.elapsed().as_millis() as u64;
            mask
        };

        self.report_stage(ProcessingStage::FormatConversion);
        OutputFormatHandler::validate_for_background_removal(self.config.output_format);
        let final_image = OutputFormatHandler::convert_format(rgba, self.config.output_format)?;

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        metadata.timings = timings.clone();

        if self.config.debug {
            let stats = mask.statistics();
            info!(
                "Mask: {} of {} pixels foreground ({:.1}%), seed {:?}",
                stats.foreground_pixels,
                stats.total_pixels,
                stats.foreground_ratio * 100.0,
                metadata.centroid
            );
        }

        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(ProcessingStage::Completed);
            tracker.report_completion(timings);
        }

        Ok(RemovalResult::new(
            final_image,
            mask,
            original_dimensions,
            metadata,
        ))
    }

    /// Saliency, region growing and refinement with per-stage spans and timings
    fn compute_mask(
        &mut self,
        rgba: &RgbaImage,
        timings: &mut ProcessingTimings,
    ) -> (SegmentationMask, Centroid) {
        let params = self.config.params.clone();
        let parallel = self.config.parallel;
        let (width, height) = rgba.dimensions();

        self.report_stage(ProcessingStage::SaliencyAnalysis);
        let saliency_start = Instant::now();
        let saliency = {
            let _span = span!(Level::DEBUG, "saliency", width, height).entered();
            SaliencyAnalyzer::from_params(&params)
                .with_parallel(parallel)
                .compute_saliency(rgba)
        };
        timings.saliency_ms = saliency_start.elapsed().as_millis() as u64;

        self.report_stage(ProcessingStage::RegionGrowing);
        let growing_start = Instant::now();
        let (mask, centroid) = {
            let _span = span!(Level::DEBUG, "region_growing", width, height).entered();
            RegionSegmenter::from_params(&params).segment(&saliency)
        };
        timings.segmentation_ms = growing_start.elapsed().as_millis() as u64;

        self.report_stage(ProcessingStage::MaskRefinement);
        let refine_start = Instant::now();
        let refined = {
            let _span = span!(Level::DEBUG, "mask_refinement", width, height).entered();
            MaskRefiner::from_params(&params)
                .with_parallel(parallel)
                .refine(&mask)
        };
        timings.refinement_ms = refine_start.elapsed().as_millis() as u64;

        debug!(
            "Seed ({}, {}){}, {} foreground pixels after refinement",
            centroid.x,
            centroid.y,
            if centroid.is_fallback { " [fallback]" } else { "" },
            refined.statistics().foreground_pixels
        );

        (refined, centroid)
    }

    fn compositor(&self) -> AlphaMatteCompositor {
        AlphaMatteCompositor::from_params(&self.config.params).with_parallel(self.config.parallel)
    }

    fn is_too_small(&self, rgba: &RgbaImage) -> bool {
        let (width, height) = rgba.dimensions();
        let window = self.config.params.saliency_window;
        width < window || height < window
    }

    fn start_run(&mut self) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.restart();
        }
    }

    fn report_stage(&mut self, stage: ProcessingStage) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(stage);
        }
    }

    fn track_error<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            if let Some(ref tracker) = self.progress_tracker {
                tracker.report_error(&e.to_string());
            }
        }
        result
    }
}

impl std::fmt::Debug for BackgroundRemovalProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRemovalProcessor")
            .field("config", &self.config)
            .field("progress", &self.progress_tracker.is_some())
            .finish()
    }
}

/// Convenience for callers that only hold a [`RemovalConfig`]
///
/// # Errors
/// Returns `BgRemovalError::InvalidConfig` for out-of-range parameters
pub fn processor_for(config: &RemovalConfig) -> Result<BackgroundRemovalProcessor> {
    BackgroundRemovalProcessor::new(ProcessorConfig::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_images::{square, uniform};
    use crate::error::BgRemovalError;
    use crate::services::ProgressUpdate;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct StageRecorder {
        stages: Arc<Mutex<Vec<ProcessingStage>>>,
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for StageRecorder {
        fn report_progress(&self, update: ProgressUpdate) {
            self.stages.lock().unwrap().push(update.stage);
        }

        fn report_completion(&self, _timings: ProcessingTimings) {}

        fn report_error(&self, _stage: ProcessingStage, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    fn processor() -> BackgroundRemovalProcessor {
        BackgroundRemovalProcessor::new(ProcessorConfig::default()).unwrap()
    }

    #[test]
    fn test_processor_config_builder_chain() {
        let config = ProcessorConfigBuilder::new()
            .feather_radius(5)
            .growth_policy(GrowthPolicy::PassingOnly)
            .jpeg_quality(95)
            .debug(true)
            .build()
            .unwrap();

        assert_eq!(config.params.feather_radius, 5);
        assert_eq!(config.params.growth_policy, GrowthPolicy::PassingOnly);
        assert_eq!(config.jpeg_quality, 95);
        assert!(config.debug);
        assert_eq!(config.to_removal_config().params.feather_radius, 5);
    }

    #[test]
    fn test_processor_config_rejects_even_kernel() {
        let result = ProcessorConfigBuilder::new().morphology_kernel(4).build();
        assert!(matches!(result, Err(BgRemovalError::InvalidConfig(_))));
    }

    #[test]
    fn test_small_image_is_cleared_not_rejected() {
        let image = DynamicImage::ImageRgba8(uniform(4, 4, [200, 10, 10, 255]));
        let result = processor().process_image(&image).unwrap();

        assert!(result.metadata.degraded);
        assert!(result.metadata.centroid.is_none());
        assert_eq!(result.dimensions(), (4, 4));
        assert!(result.to_rgba_bytes().chunks(4).all(|p| p[3] == 0));
    }

    #[test]
    fn test_stages_are_reported_in_order() {
        let recorder = StageRecorder::default();
        let stages = recorder.stages.clone();
        let mut processor = processor().with_progress_reporter(Box::new(recorder));

        let image = DynamicImage::ImageRgba8(square(30, 30, 10, 10, 10));
        processor.process_image(&image).unwrap();

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                ProcessingStage::SaliencyAnalysis,
                ProcessingStage::RegionGrowing,
                ProcessingStage::MaskRefinement,
                ProcessingStage::AlphaMatting,
                ProcessingStage::FormatConversion,
                ProcessingStage::Completed,
            ]
        );
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let recorder = StageRecorder::default();
        let errors = recorder.errors.clone();
        let mut processor = processor().with_progress_reporter(Box::new(recorder));

        let err = processor.process_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, BgRemovalError::Decode(_)));
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_segment_foreground_matches_full_run_mask() {
        let image = DynamicImage::ImageRgba8(square(40, 40, 12, 12, 16));
        let mut processor = processor();
        let mask = processor.segment_foreground(&image).unwrap();
        let result = processor.process_image(&image).unwrap();
        assert_eq!(mask, result.mask);
        assert!(mask.is_binary());
    }

    #[test]
    fn test_apply_mask_resizes_mask() {
        let image = DynamicImage::ImageRgba8(uniform(20, 20, [9, 9, 9, 255]));
        let mask = SegmentationMask::new(vec![255; 100], (10, 10));
        let result = processor().apply_mask(&image, &mask).unwrap();

        assert_eq!(result.mask.dimensions, (20, 20));
        assert!(result.mask.is_binary());
        let rgba = result.image.to_rgba8();
        assert_eq!(rgba.get_pixel(10, 10).0[3], 255);
    }

    #[test]
    fn test_apply_mask_empty_mask_clears_interior() {
        let image = DynamicImage::ImageRgba8(uniform(12, 12, [9, 9, 9, 255]));
        let mask = SegmentationMask::empty(12, 12);
        let result = processor().apply_mask(&image, &mask).unwrap();
        let rgba = result.image.to_rgba8();
        assert_eq!(rgba.get_pixel(6, 6).0[3], 0);
        assert_eq!(rgba.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_jpeg_output_drops_alpha() {
        let config = ProcessorConfig::builder()
            .output_format(OutputFormat::Jpeg)
            .build()
            .unwrap();
        let mut processor = BackgroundRemovalProcessor::new(config).unwrap();
        let image = DynamicImage::ImageRgba8(square(24, 24, 8, 8, 8));
        let result = processor.process_image(&image).unwrap();
        assert!(result.image.as_rgb8().is_some());
        assert_eq!(result.metadata.output_format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_save_result_reports_saving_and_records_encode_time() {
        let recorder = StageRecorder::default();
        let stages = recorder.stages.clone();
        let mut processor = processor().with_progress_reporter(Box::new(recorder));

        let image = DynamicImage::ImageRgba8(square(30, 30, 10, 10, 10));
        let mut result = processor.process_image(&image).unwrap();
        assert!(result.metadata.timings.image_encode_ms.is_none());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.png");
        processor.save_result(&mut result, &path).unwrap();

        assert!(path.is_file());
        assert!(result.metadata.timings.image_encode_ms.is_some());
        assert!(result.timing_summary().contains("Encode:"));
        assert_eq!(
            stages.lock().unwrap().last(),
            Some(&ProcessingStage::FileSaving)
        );
    }

    #[test]
    fn test_output_quality_follows_format() {
        let webp = ProcessorConfig::builder()
            .output_format(OutputFormat::WebP)
            .webp_quality(70)
            .jpeg_quality(95)
            .build()
            .unwrap();
        assert_eq!(webp.output_quality(), 70);

        let jpeg = ProcessorConfig::builder().jpeg_quality(95).build().unwrap();
        assert_eq!(jpeg.output_quality(), 95);
    }

    #[tokio::test]
    async fn test_process_reader_reports_loading_and_decode_errors() {
        let recorder = StageRecorder::default();
        let stages = recorder.stages.clone();
        let errors = recorder.errors.clone();
        let mut processor = processor().with_progress_reporter(Box::new(recorder));

        let err = processor
            .process_reader(std::io::Cursor::new(b"not an image".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, BgRemovalError::Decode(_)));
        assert_eq!(
            stages.lock().unwrap().first(),
            Some(&ProcessingStage::ImageLoading)
        );
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_process_reader_matches_process_bytes() {
        let mut bytes = Vec::new();
        square(24, 24, 6, 6, 12)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let mut processor = processor();
        let from_reader = processor
            .process_reader(std::io::Cursor::new(bytes.clone()))
            .await
            .unwrap();
        let from_bytes = processor.process_bytes(&bytes).unwrap();

        assert_eq!(from_reader.mask, from_bytes.mask);
        assert_eq!(from_reader.to_rgba_bytes(), from_bytes.to_rgba_bytes());
    }
}
