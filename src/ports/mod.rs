// Ports - Interface definitions (contracts)

use std::path::Path;

use crate::domain::model::*;
use crate::error::SplitXResult;

/// Port for one way of reading a source's total duration
pub trait DurationSource: Send + Sync {
    /// Short strategy name used in log lines
    fn name(&self) -> &'static str;

    /// Duration of the file in seconds
    fn probe_duration(&self, path: &Path) -> SplitXResult<f64>;
}

/// Port for producing one segment file from one interval
///
/// Implementations report per-segment failures through [`EncodeOutcome`]
/// instead of erroring; whether a failure stops the batch is decided by the
/// runner's [`FailurePolicy`].
pub trait SegmentEncoder: Send {
    /// Short engine name used in log lines
    fn name(&self) -> &'static str;

    /// Check once, before the batch starts, that the encoder can run at all
    fn preflight(&mut self) -> SplitXResult<()> {
        Ok(())
    }

    /// Produce the output file for one interval
    fn encode(&mut self, request: EncodeRequest) -> EncodeOutcome;

    /// Release anything held open for `source` after its last segment
    fn finish_source(&mut self, _source: &Path) {}
}
