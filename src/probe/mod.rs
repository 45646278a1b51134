//! Duration probing module
//!
//! Tries each configured [`DurationSource`] in order and returns the first
//! usable duration. The default chain asks ffprobe first and falls back to
//! opening the file through libav.

use std::path::Path;

use tracing::{debug, warn};

use crate::adapters::{FFprobeAdapter, ProbeLibavAdapter};
use crate::domain::model::SourceVideo;
use crate::error::{SplitXError, SplitXResult};
use crate::ports::DurationSource;

/// Result of a successful probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub source: SourceVideo,
    /// Name of the strategy that produced the duration
    pub strategy: &'static str,
    /// True when an earlier strategy failed first
    pub used_fallback: bool,
}

/// Ordered fallback chain of duration sources
pub struct DurationProber {
    sources: Vec<Box<dyn DurationSource>>,
}

impl DurationProber {
    /// Create a prober from explicit strategies, tried in order
    pub fn new(sources: Vec<Box<dyn DurationSource>>) -> Self {
        Self { sources }
    }

    /// ffprobe first, libav second
    pub fn with_default_chain(ffprobe: FFprobeAdapter) -> Self {
        Self::new(vec![Box::new(ffprobe), Box::new(ProbeLibavAdapter::new())])
    }

    /// Probe `path`, failing only if every strategy fails
    pub fn probe(&self, path: &Path) -> SplitXResult<ProbeReport> {
        let mut failures = Vec::new();

        for (position, source) in self.sources.iter().enumerate() {
            match source.probe_duration(path) {
                Ok(duration) => match SourceVideo::new(path, duration) {
                    Ok(video) => {
                        debug!(
                            "Probed {} with {}: {:.3}s",
                            path.display(),
                            source.name(),
                            duration
                        );
                        return Ok(ProbeReport {
                            source: video,
                            strategy: source.name(),
                            used_fallback: position > 0,
                        });
                    }
                    Err(e) => failures.push(format!("{}: {}", source.name(), e)),
                },
                Err(e) => {
                    warn!("{} probe failed for {}: {}", source.name(), path.display(), e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(SplitXError::ProbeError {
            path: path.display().to_string(),
            message: if failures.is_empty() {
                "no probe strategy configured".to_string()
            } else {
                failures.join("; ")
            },
        })
    }
}
