//! Service layer
//!
//! File and stream I/O, output format handling and progress reporting live
//! here so the pipeline stages stay pure buffer-in, buffer-out code.

pub mod format;
pub mod io;
pub mod progress;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate,
};
