//! SplitX Video Segment Splitter Library
//!
//! Splits video files into fixed-length MP4 segments written to one output
//! directory per source. Durations come from ffprobe with a libav fallback;
//! segments are produced either by the ffmpeg command-line tool or in-process
//! through libav.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod output;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use app::{BatchHandle, BatchRunner};
pub use domain::model::{BatchEvent, BatchJob, BatchStatus, BatchSummary, FailurePolicy, QualityTier};
pub use error::{SplitXError, SplitXResult};

/// Initialize SplitX library
pub fn init() -> SplitXResult<()> {
    ffmpeg_next::init().map_err(|e| SplitXError::FFmpegInitError {
        message: e.to_string(),
    })?;

    Ok(())
}
