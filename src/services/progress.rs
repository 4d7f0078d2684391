//! Progress reporting for pipeline runs
//!
//! The processor reports each stage it enters; frontends decide what to do
//! with those reports by supplying a [`ProgressReporter`].

use crate::types::ProcessingTimings;
use instant::Instant;

/// Stages of a single background removal run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Loading and decoding input image
    ImageLoading,
    /// Computing the local-contrast saliency field
    SaliencyAnalysis,
    /// Selecting the seed and growing the foreground region
    RegionGrowing,
    /// Closing and opening the mask
    MaskRefinement,
    /// Writing the feathered alpha channel
    AlphaMatting,
    /// Converting to output format
    FormatConversion,
    /// Saving result to file
    FileSaving,
    /// Processing completed
    Completed,
}

impl ProcessingStage {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ImageLoading => "Loading input image",
            ProcessingStage::SaliencyAnalysis => "Analysing local contrast",
            ProcessingStage::RegionGrowing => "Growing foreground region",
            ProcessingStage::MaskRefinement => "Refining mask",
            ProcessingStage::AlphaMatting => "Feathering alpha matte",
            ProcessingStage::FormatConversion => "Converting output format",
            ProcessingStage::FileSaving => "Saving result",
            ProcessingStage::Completed => "Processing completed",
        }
    }

    /// Typical completion percentage when this stage starts
    ///
    /// Saliency analysis dominates the run time, so the stages after it start
    /// late in the range.
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::ImageLoading => 5,
            ProcessingStage::SaliencyAnalysis => 10,
            ProcessingStage::RegionGrowing => 75,
            ProcessingStage::MaskRefinement => 85,
            ProcessingStage::AlphaMatting => 92,
            ProcessingStage::FormatConversion => 97,
            ProcessingStage::FileSaving => 99,
            ProcessingStage::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since the run started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self::with_description(stage, stage.description().to_string(), start_time)
    }

    #[must_use]
    pub fn with_description(
        stage: ProcessingStage,
        description: String,
        start_time: Instant,
    ) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
            description,
        }
    }
}

/// Receives progress reports from the processor
pub trait ProgressReporter: Send + Sync {
    fn report_progress(&self, update: ProgressUpdate);

    /// Called once per successful run with the final timings
    fn report_completion(&self, timings: ProcessingTimings);

    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// Discards every report
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Logs progress through the `log` facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log::info!("Background removal completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  Saliency: {}ms", timings.saliency_ms);
            log::info!("  Region growing: {}ms", timings.segmentation_ms);
            log::info!("  Refinement: {}ms", timings.refinement_ms);
            log::info!("  Matting: {}ms", timings.matting_ms);
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("Error during {}: {}", stage.description(), error);
    }
}

/// Tracks the current stage and elapsed time of one run
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Box::new(NoOpProgressReporter))
    }

    #[must_use]
    pub fn console(verbose: bool) -> Self {
        Self::new(Box::new(ConsoleProgressReporter::new(verbose)))
    }

    /// Restart the clock for a new run
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
        self.current_stage = None;
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    pub fn report_completion(&self, timings: ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error against the most recent stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::ImageLoading);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingReporter {
        updates: Arc<Mutex<Vec<ProgressUpdate>>>,
        completions: Arc<Mutex<Vec<ProcessingTimings>>>,
        errors: Arc<Mutex<Vec<(ProcessingStage, String)>>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.updates.lock().unwrap().push(update);
        }

        fn report_completion(&self, timings: ProcessingTimings) {
            self.completions.lock().unwrap().push(timings);
        }

        fn report_error(&self, stage: ProcessingStage, error: &str) {
            self.errors.lock().unwrap().push((stage, error.to_string()));
        }
    }

    #[test]
    fn test_stage_percentages_increase() {
        let stages = [
            ProcessingStage::ImageLoading,
            ProcessingStage::SaliencyAnalysis,
            ProcessingStage::RegionGrowing,
            ProcessingStage::MaskRefinement,
            ProcessingStage::AlphaMatting,
            ProcessingStage::FormatConversion,
            ProcessingStage::FileSaving,
            ProcessingStage::Completed,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].progress_percentage() < pair[1].progress_percentage());
        }
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
    }

    #[test]
    fn test_progress_update_creation() {
        let update = ProgressUpdate::new(ProcessingStage::RegionGrowing, Instant::now());
        assert_eq!(update.stage, ProcessingStage::RegionGrowing);
        assert_eq!(update.progress, 75);
        assert_eq!(update.description, "Growing foreground region");
        assert!(update.elapsed_ms < 1000);
    }

    #[test]
    fn test_progress_tracker_records_stages() {
        let reporter = RecordingReporter::default();
        let updates = reporter.updates.clone();
        let completions = reporter.completions.clone();
        let errors = reporter.errors.clone();

        let mut tracker = ProgressTracker::new(Box::new(reporter));
        tracker.report_stage(ProcessingStage::SaliencyAnalysis);
        tracker.report_stage(ProcessingStage::MaskRefinement);
        tracker.report_completion(ProcessingTimings::default());
        tracker.report_error("boom");

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].stage, ProcessingStage::SaliencyAnalysis);
        assert_eq!(updates[1].description, ProcessingStage::MaskRefinement.description());
        assert_eq!(completions.lock().unwrap().len(), 1);

        let errors = errors.lock().unwrap();
        assert_eq!(errors[0], (ProcessingStage::MaskRefinement, "boom".to_string()));
        assert_eq!(tracker.current_stage(), Some(ProcessingStage::MaskRefinement));
    }

    #[test]
    fn test_restart_clears_stage() {
        let mut tracker = ProgressTracker::no_op();
        tracker.report_stage(ProcessingStage::AlphaMatting);
        tracker.restart();
        assert_eq!(tracker.current_stage(), None);
    }

    #[test]
    fn test_console_reporter_does_not_panic() {
        let mut tracker = ProgressTracker::console(true);
        tracker.report_stage(ProcessingStage::ImageLoading);
        tracker.report_completion(ProcessingTimings::default());
        tracker.report_error("test error");
    }
}
