// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{SplitXError, SplitXResult};

/// A source video whose duration is known
#[derive(Debug, Clone, PartialEq)]
pub struct SourceVideo {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

impl SourceVideo {
    /// Create a new source video, rejecting non-positive or non-finite durations
    pub fn new(path: impl Into<PathBuf>, duration_seconds: f64) -> SplitXResult<Self> {
        let path = path.into();
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(SplitXError::ProbeError {
                path: path.display().to_string(),
                message: format!("invalid duration {}", duration_seconds),
            });
        }
        Ok(Self { path, duration_seconds })
    }

    /// File stem used for the output subdirectory and segment names
    pub fn base_name(&self) -> String {
        crate::output::base_name(&self.path)
    }
}

/// One contiguous cut interval, `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// 1-based position within the plan
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl Interval {
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {:.2}s - {:.2}s",
            self.index, self.start_seconds, self.end_seconds
        )
    }
}

/// Ordered, contiguous intervals covering a whole source
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    intervals: Vec<Interval>,
    duration_seconds: f64,
    segment_length_seconds: f64,
}

impl SegmentPlan {
    pub(crate) fn from_parts(
        intervals: Vec<Interval>,
        duration_seconds: f64,
        segment_length_seconds: f64,
    ) -> Self {
        Self {
            intervals,
            duration_seconds,
            segment_length_seconds,
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn segment_length_seconds(&self) -> f64 {
        self.segment_length_seconds
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }
}

impl<'a> IntoIterator for &'a SegmentPlan {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

/// Quality preset for the external encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    /// Parse tier from string
    pub fn parse(value: &str) -> SplitXResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" | "med" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            other => Err(SplitXError::ConfigError {
                message: format!(
                    "Invalid quality tier: {}. Valid tiers: low, medium, high",
                    other
                ),
            }),
        }
    }

    /// x264 constant rate factor for this tier
    pub fn crf(&self) -> u8 {
        match self {
            QualityTier::Low => 28,
            QualityTier::Medium => 23,
            QualityTier::High => 18,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which encoder variant a batch uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// In-process encoding through libav
    Libav,
    /// Spawns the ffmpeg command-line tool per segment
    #[default]
    Ffmpeg,
}

impl EngineKind {
    /// Parse engine from string
    pub fn parse(value: &str) -> SplitXResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "libav" | "library" => Ok(EngineKind::Libav),
            "ffmpeg" | "external" | "process" => Ok(EngineKind::Ffmpeg),
            other => Err(SplitXError::ConfigError {
                message: format!("Invalid engine: {}. Valid engines: ffmpeg, libav", other),
            }),
        }
    }

    /// Failure policy each engine historically used
    pub fn default_failure_policy(&self) -> FailurePolicy {
        match self {
            EngineKind::Libav => FailurePolicy::Abort,
            EngineKind::Ffmpeg => FailurePolicy::Continue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Libav => "libav",
            EngineKind::Ffmpeg => "ffmpeg",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the runner does when a file or segment fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole batch at the first failure
    Abort,
    /// Log a warning and move on to the next segment or file
    Continue,
}

impl FailurePolicy {
    /// Parse policy from string
    pub fn parse(value: &str) -> SplitXResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "abort" | "stop" => Ok(FailurePolicy::Abort),
            "continue" | "skip" => Ok(FailurePolicy::Continue),
            other => Err(SplitXError::ConfigError {
                message: format!("Invalid failure policy: {}. Valid policies: abort, continue", other),
            }),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Continue => f.write_str("continue"),
        }
    }
}

/// Everything one encoder call needs to produce one segment file
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub source: PathBuf,
    pub interval: Interval,
    pub output: PathBuf,
    pub quality: QualityTier,
}

/// Result of encoding a single interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeOutcome {
    pub index: usize,
    pub success: bool,
    /// Error detail, empty on success
    pub detail: String,
}

impl EncodeOutcome {
    pub fn succeeded(index: usize) -> Self {
        Self {
            index,
            success: true,
            detail: String::new(),
        }
    }

    pub fn failed(index: usize, detail: impl Into<String>) -> Self {
        Self {
            index,
            success: false,
            detail: detail.into(),
        }
    }
}

/// Position of the runner within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// 1-based index of the current file
    pub file_index: usize,
    pub file_count: usize,
    /// Segments of the current file finished so far
    pub segment_index: usize,
    pub segment_count: usize,
}

impl BatchProgress {
    pub fn new(file_index: usize, file_count: usize, segment_index: usize, segment_count: usize) -> Self {
        Self {
            file_index,
            file_count,
            segment_index,
            segment_count,
        }
    }

    /// Progress marking the given file as entirely done
    pub fn file_done(file_index: usize, file_count: usize) -> Self {
        Self::new(file_index, file_count, 1, 1)
    }

    /// Terminal progress for a batch of `file_count` files
    pub fn finished(file_count: usize) -> Self {
        let file_count = file_count.max(1);
        Self::file_done(file_count, file_count)
    }

    /// Overall fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.file_count == 0 {
            return 1.0;
        }
        let within_file = if self.segment_count == 0 {
            1.0
        } else {
            self.segment_index as f64 / self.segment_count as f64
        };
        let files_before = self.file_index.saturating_sub(1) as f64;
        ((files_before + within_file) / self.file_count as f64).clamp(0.0, 1.0)
    }
}

/// Severity of a batch log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line of the batch log shown to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Terminal state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Completed,
    CompletedWithWarnings,
    Failed,
    Cancelled,
}

impl BatchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::CompletedWithWarnings)
    }
}

/// Final report of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub status: BatchStatus,
    pub files_total: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub segments_written: usize,
    pub segments_failed: usize,
    pub warnings: Vec<String>,
    /// Consolidated error message when the batch failed
    pub error: Option<String>,
}

impl BatchSummary {
    pub(crate) fn new(files_total: usize) -> Self {
        Self {
            status: BatchStatus::Completed,
            files_total,
            files_processed: 0,
            files_skipped: 0,
            segments_written: 0,
            segments_failed: 0,
            warnings: Vec::new(),
            error: None,
        }
    }
}

/// Notification sent from the batch worker to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    Progress { progress: BatchProgress, fraction: f64 },
    Log { line: LogLine },
    Finished { summary: BatchSummary },
}

/// Parameters of one batch run, fixed before the run starts
#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    pub files: Vec<PathBuf>,
    pub output_root: PathBuf,
    pub segment_length_seconds: f64,
    pub quality: QualityTier,
    pub failure_policy: FailurePolicy,
}

impl BatchJob {
    /// Check the job before any work starts
    pub fn validate(&self) -> SplitXResult<()> {
        if self.files.is_empty() {
            return Err(SplitXError::NoInputFiles);
        }
        if !self.segment_length_seconds.is_finite() || self.segment_length_seconds <= 0.0 {
            return Err(SplitXError::PlanError {
                message: format!(
                    "segment length must be positive, got {}",
                    self.segment_length_seconds
                ),
            });
        }
        Ok(())
    }
}
