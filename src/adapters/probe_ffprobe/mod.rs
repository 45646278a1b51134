// FFprobe adapter - Fast duration lookup through the ffprobe tool

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{SplitXError, SplitXResult};
use crate::ports::DurationSource;
use crate::utils::truncate_chars;

/// Duration source that asks ffprobe for the container duration
pub struct FFprobeAdapter {
    program: PathBuf,
}

impl FFprobeAdapter {
    /// Create adapter invoking `ffprobe` from PATH
    pub fn new() -> Self {
        Self::with_program("ffprobe")
    }

    /// Create adapter invoking a specific executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Parse the bare `format=duration` value printed by ffprobe
    pub fn parse_duration(stdout: &str, path: &Path) -> SplitXResult<f64> {
        let value = stdout.lines().map(str::trim).find(|line| !line.is_empty());
        let fail = |message: String| SplitXError::ProbeError {
            path: path.display().to_string(),
            message,
        };

        let value = value.ok_or_else(|| fail("ffprobe printed no duration".to_string()))?;
        let duration: f64 = value
            .parse()
            .map_err(|_| fail(format!("ffprobe returned non-numeric duration '{}'", value)))?;

        if !duration.is_finite() || duration <= 0.0 {
            return Err(fail(format!("ffprobe returned invalid duration {}", duration)));
        }
        Ok(duration)
    }
}

impl Default for FFprobeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationSource for FFprobeAdapter {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe_duration(&self, path: &Path) -> SplitXResult<f64> {
        debug!("Running {} on {}", self.program.display(), path.display());

        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SplitXError::tool_missing("ffprobe")
                } else {
                    SplitXError::IoError(e)
                }
            })?;

        if !output.status.success() {
            return Err(SplitXError::ProbeError {
                path: path.display().to_string(),
                message: format!(
                    "ffprobe exited with {}: {}",
                    output.status,
                    truncate_chars(&String::from_utf8_lossy(&output.stderr), 100)
                ),
            });
        }

        Self::parse_duration(&String::from_utf8_lossy(&output.stdout), path)
    }
}
