// Probe LibAV adapter - Duration lookup by opening the file through libav

use std::path::Path;

use ffmpeg_next as ffmpeg;
use tracing::debug;

use crate::error::{SplitXError, SplitXResult};
use crate::ports::DurationSource;
use crate::utils::time::ts_to_seconds;

/// Duration source that opens the container with libav
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    /// Create new LibAV probing adapter
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProbeLibavAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationSource for ProbeLibavAdapter {
    fn name(&self) -> &'static str {
        "libav"
    }

    fn probe_duration(&self, path: &Path) -> SplitXResult<f64> {
        let fail = |message: String| SplitXError::ProbeError {
            path: path.display().to_string(),
            message,
        };

        ffmpeg::init().map_err(|e| SplitXError::FFmpegInitError {
            message: e.to_string(),
        })?;

        // Dropping the context at the end of this scope closes the file.
        let input = ffmpeg::format::input(&path)
            .map_err(|e| fail(format!("libav could not open file: {}", e)))?;

        let container = input.duration();
        let mut duration = if container > 0 {
            container as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE)
        } else {
            0.0
        };

        if duration <= 0.0 {
            if let Some(stream) = input.streams().best(ffmpeg::media::Type::Video) {
                let tb = stream.time_base();
                if stream.duration() > 0 {
                    duration = ts_to_seconds(stream.duration(), (tb.numerator(), tb.denominator()));
                }
            }
        }

        debug!("libav reports {:.3}s for {}", duration, path.display());

        if !duration.is_finite() || duration <= 0.0 {
            return Err(fail("libav reported no usable duration".to_string()));
        }
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_probe_rejects_non_media_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fake.mp4");
        std::fs::write(&path, b"fake video data").unwrap();

        let result = ProbeLibavAdapter::new().probe_duration(&path);
        assert!(result.is_err());
    }
}
