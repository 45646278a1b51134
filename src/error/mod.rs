//! Error handling module for SplitX

use thiserror::Error;

/// Main error type for SplitX operations
#[derive(Error, Debug)]
pub enum SplitXError {
    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// Batch started without any input
    #[error("No input files selected")]
    NoInputFiles,

    /// Duration could not be obtained by any probe strategy
    #[error("Failed to probe duration of {path}: {message}")]
    ProbeError { path: String, message: String },

    /// Invalid duration or segment length handed to the planner
    #[error("Invalid segment plan: {message}")]
    PlanError { message: String },

    /// A segment could not be produced
    #[error("Failed to encode segment {index}: {message}")]
    EncodeError { index: usize, message: String },

    /// Required external tool is not installed
    #[error("Required tool '{tool}' was not found. {hint}")]
    DependencyMissing { tool: String, hint: String },

    /// A batch is already running on this runner
    #[error("A batch is already running")]
    AlreadyRunning,

    /// Output directory or file could not be prepared
    #[error("Failed to prepare output: {message}")]
    OutputError { message: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInitError { message: String },

    /// Batch stopped by a cancellation request
    #[error("Batch cancelled")]
    Cancelled,

    /// Background worker ended abnormally
    #[error("Batch worker failed: {message}")]
    WorkerError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),
}

impl SplitXError {
    /// Build a missing-tool error with the standard install hint
    pub fn tool_missing(tool: &str) -> Self {
        SplitXError::DependencyMissing {
            tool: tool.to_string(),
            hint: "Install FFmpeg (https://ffmpeg.org/download.html) and make sure it is on PATH, \
                   or point the configuration at the executable."
                .to_string(),
        }
    }
}

/// Result type alias for SplitX operations
pub type SplitXResult<T> = std::result::Result<T, SplitXError>;
