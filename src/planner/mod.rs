//! Segment planning module
//!
//! Turns a source duration and a segment length into the ordered list of cut
//! intervals. Every interval except possibly the last is exactly
//! `segment_length` long; the last one ends exactly at the source duration.

use tracing::debug;

use crate::domain::model::{Interval, SegmentPlan};
use crate::error::{SplitXError, SplitXResult};

/// Remainders shorter than this are rounding noise, not a real tail segment.
const TAIL_EPSILON_SECONDS: f64 = 1e-9;

/// Planner for fixed-length segmentation
pub struct SegmentPlanner;

impl SegmentPlanner {
    /// Create a new segment planner
    pub fn new() -> Self {
        Self
    }

    /// Plan the cut intervals for a source of `duration_seconds`
    pub fn plan(&self, duration_seconds: f64, segment_length_seconds: f64) -> SplitXResult<SegmentPlan> {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(SplitXError::PlanError {
                message: format!("duration must be positive, got {}", duration_seconds),
            });
        }
        if !segment_length_seconds.is_finite() || segment_length_seconds <= 0.0 {
            return Err(SplitXError::PlanError {
                message: format!(
                    "segment length must be positive, got {}",
                    segment_length_seconds
                ),
            });
        }

        let count = Self::segment_count(duration_seconds, segment_length_seconds);
        let mut intervals = Vec::with_capacity(count);
        for index in 1..=count {
            let start_seconds = (index - 1) as f64 * segment_length_seconds;
            let end_seconds = if index == count {
                duration_seconds
            } else {
                (index as f64 * segment_length_seconds).min(duration_seconds)
            };
            intervals.push(Interval {
                index,
                start_seconds,
                end_seconds,
            });
        }

        debug!(
            "Planned {} segments for {:.3}s at {:.3}s each",
            count, duration_seconds, segment_length_seconds
        );

        Ok(SegmentPlan::from_parts(
            intervals,
            duration_seconds,
            segment_length_seconds,
        ))
    }

    /// `ceil(duration / segment_length)`, never below one
    fn segment_count(duration_seconds: f64, segment_length_seconds: f64) -> usize {
        let mut count = (duration_seconds / segment_length_seconds).ceil().max(1.0) as usize;
        // Division can land a hair above an integer, which would leave an empty tail.
        while count > 1
            && (count - 1) as f64 * segment_length_seconds >= duration_seconds - TAIL_EPSILON_SECONDS
        {
            count -= 1;
        }
        count
    }
}

impl Default for SegmentPlanner {
    fn default() -> Self {
        Self::new()
    }
}
