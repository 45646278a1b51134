//! FFmpeg execution adapter
//!
//! Produces each segment by spawning the ffmpeg command-line tool. A non-zero
//! exit status becomes a failed [`EncodeOutcome`] carrying a short stderr
//! snippet; it never panics or errors out of `encode`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::domain::model::*;
use crate::error::SplitXResult;
use crate::ports::SegmentEncoder;
use crate::utils::time::format_seconds_arg;
use crate::utils::tools::require_tool;
use crate::utils::truncate_chars;

/// Maximum stderr characters kept in a failed outcome
const STDERR_SNIPPET_CHARS: usize = 100;

/// Encoding settings for the external tool
#[derive(Debug, Clone, PartialEq)]
pub struct FFmpegSettings {
    pub program: PathBuf,
    pub preset: String,
    pub audio_bitrate: String,
}

impl Default for FFmpegSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            preset: "fast".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

/// Segment encoder backed by the ffmpeg executable
pub struct FFmpegAdapter {
    settings: FFmpegSettings,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new(settings: FFmpegSettings) -> Self {
        Self { settings }
    }

    /// Build the argument list for one segment
    ///
    /// The interval is passed as start offset plus duration so ffmpeg does not
    /// have to re-derive it from an end time.
    pub fn build_args(&self, request: &EncodeRequest) -> Vec<OsString> {
        let interval = &request.interval;
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-ss"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(format_seconds_arg(interval.start_seconds).into());
        args.push("-i".into());
        args.push(request.source.as_os_str().to_owned());
        args.push("-t".into());
        args.push(format_seconds_arg(interval.duration_seconds()).into());
        args.extend(["-c:v", "libx264", "-crf"].iter().map(OsString::from));
        args.push(request.quality.crf().to_string().into());
        args.push("-preset".into());
        args.push(self.settings.preset.as_str().into());
        args.extend(["-c:a", "aac", "-b:a"].iter().map(OsString::from));
        args.push(self.settings.audio_bitrate.as_str().into());
        args.extend(["-movflags", "+faststart"].iter().map(OsString::from));
        args.push(request.output.as_os_str().to_owned());

        args
    }
}

impl SegmentEncoder for FFmpegAdapter {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn preflight(&mut self) -> SplitXResult<()> {
        let tool = require_tool("ffmpeg", &self.settings.program)?;
        info!(
            "Using ffmpeg at {}: {}",
            tool.path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| self.settings.program.display().to_string()),
            tool.version.as_deref().unwrap_or("unknown version")
        );
        Ok(())
    }

    fn encode(&mut self, request: EncodeRequest) -> EncodeOutcome {
        let index = request.interval.index;
        let args = self.build_args(&request);
        debug!("{} {:?}", self.settings.program.display(), args);

        let output = match Command::new(&self.settings.program).args(&args).output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to spawn ffmpeg for segment {}: {}", index, e);
                return EncodeOutcome::failed(index, format!("failed to start ffmpeg: {}", e));
            }
        };

        if output.status.success() {
            EncodeOutcome::succeeded(index)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet = truncate_chars(&stderr, STDERR_SNIPPET_CHARS);
            warn!(
                "ffmpeg exited with {} for segment {} of {}",
                output.status,
                index,
                request.source.display()
            );
            EncodeOutcome::failed(
                index,
                if snippet.is_empty() {
                    format!("ffmpeg exited with {}", output.status)
                } else {
                    snippet
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SplitXError;

    fn request(start: f64, end: f64, quality: QualityTier) -> EncodeRequest {
        EncodeRequest {
            source: PathBuf::from("in/movie.mov"),
            interval: Interval {
                index: 3,
                start_seconds: start,
                end_seconds: end,
            },
            output: PathBuf::from("out/movie/movie_segment_003.mp4"),
            quality,
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_build_args_uses_offset_and_duration() {
        let adapter = FFmpegAdapter::new(FFmpegSettings::default());
        let args = strings(adapter.build_args(&request(6.0, 7.0, QualityTier::Medium)));

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "6.000");
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "in/movie.mov");
        assert!(ss < i, "-ss must precede -i for input seeking");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "1.000");
        assert!(!args.iter().any(|a| a == "-to"));
        assert_eq!(args.last().unwrap(), "out/movie/movie_segment_003.mp4");
    }

    #[test]
    fn test_build_args_quality_and_layout() {
        let adapter = FFmpegAdapter::new(FFmpegSettings::default());
        for (tier, crf) in [
            (QualityTier::Low, "28"),
            (QualityTier::Medium, "23"),
            (QualityTier::High, "18"),
        ] {
            let args = strings(adapter.build_args(&request(0.0, 3.0, tier)));
            let pos = args.iter().position(|a| a == "-crf").unwrap();
            assert_eq!(args[pos + 1], crf);
            let pos = args.iter().position(|a| a == "-movflags").unwrap();
            assert_eq!(args[pos + 1], "+faststart");
            let pos = args.iter().position(|a| a == "-c:v").unwrap();
            assert_eq!(args[pos + 1], "libx264");
            let pos = args.iter().position(|a| a == "-c:a").unwrap();
            assert_eq!(args[pos + 1], "aac");
        }
    }

    #[test]
    fn test_preflight_names_missing_tool() {
        let mut adapter = FFmpegAdapter::new(FFmpegSettings {
            program: PathBuf::from("nonexistent_ffmpeg_12345"),
            ..FFmpegSettings::default()
        });
        match adapter.preflight() {
            Err(SplitXError::DependencyMissing { tool, .. }) => assert_eq!(tool, "ffmpeg"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_spawn_failure_is_non_fatal_outcome() {
        let mut adapter = FFmpegAdapter::new(FFmpegSettings {
            program: PathBuf::from("nonexistent_ffmpeg_12345"),
            ..FFmpegSettings::default()
        });
        let outcome = adapter.encode(request(0.0, 3.0, QualityTier::Low));
        assert!(!outcome.success);
        assert_eq!(outcome.index, 3);
        assert!(!outcome.detail.is_empty());
    }
}
