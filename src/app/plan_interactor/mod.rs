// Plan interactor - Dry run of the split use case

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::model::Interval;
use crate::error::{SplitXError, SplitXResult};
use crate::output::segment_output_path;
use crate::planner::SegmentPlanner;
use crate::probe::DurationProber;
use crate::utils::time::format_hms;

/// One row of a dry-run plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedSegment {
    #[serde(flatten)]
    pub interval: Interval,
    pub output: PathBuf,
}

/// Everything a split would do for one source, without encoding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanPreview {
    pub source: PathBuf,
    pub duration_seconds: f64,
    pub probe_strategy: String,
    pub segment_length_seconds: f64,
    pub segments: Vec<PlannedSegment>,
}

/// Interactor for the dry-run use case
pub struct PlanInteractor {
    prober: Arc<DurationProber>,
    planner: SegmentPlanner,
}

impl PlanInteractor {
    /// Create new plan interactor
    pub fn new(prober: Arc<DurationProber>) -> Self {
        Self {
            prober,
            planner: SegmentPlanner::new(),
        }
    }

    /// Probe `source` and plan its segments under `output_root`
    pub fn preview(
        &self,
        source: &Path,
        segment_length_seconds: f64,
        output_root: &Path,
    ) -> SplitXResult<PlanPreview> {
        if !source.exists() {
            return Err(SplitXError::InputFileNotFound {
                path: source.display().to_string(),
            });
        }

        let report = self.prober.probe(source)?;
        let plan = self
            .planner
            .plan(report.source.duration_seconds, segment_length_seconds)?;
        info!(
            "Planned {} segments for {}",
            plan.len(),
            source.display()
        );

        let segments = plan
            .iter()
            .map(|interval| PlannedSegment {
                interval: *interval,
                output: segment_output_path(output_root, source, interval.index),
            })
            .collect();

        Ok(PlanPreview {
            source: source.to_path_buf(),
            duration_seconds: plan.duration_seconds(),
            probe_strategy: report.strategy.to_string(),
            segment_length_seconds: plan.segment_length_seconds(),
            segments,
        })
    }

    /// Render a preview as `text`, `json` or `yaml`
    pub fn format(&self, preview: &PlanPreview, format: &str) -> SplitXResult<String> {
        match format {
            "json" => serde_json::to_string_pretty(preview).map_err(|e| SplitXError::OutputError {
                message: format!("JSON serialization failed: {}", e),
            }),
            "yaml" => serde_yaml::to_string(preview).map_err(|e| SplitXError::OutputError {
                message: format!("YAML serialization failed: {}", e),
            }),
            "text" => Ok(Self::format_as_text(preview)),
            other => Err(SplitXError::ConfigError {
                message: format!("Invalid output format: {}. Valid formats: text, json, yaml", other),
            }),
        }
    }

    fn format_as_text(preview: &PlanPreview) -> String {
        let mut output = format!(
            "{}\n  duration: {} ({:.3}s, via {})\n  segments: {} x {:.1}s\n",
            preview.source.display(),
            format_hms(preview.duration_seconds),
            preview.duration_seconds,
            preview.probe_strategy,
            preview.segments.len(),
            preview.segment_length_seconds
        );
        for segment in &preview.segments {
            output.push_str(&format!(
                "  {:>4}  {} - {}  {}\n",
                segment.interval.index,
                format_hms(segment.interval.start_seconds),
                format_hms(segment.interval.end_seconds),
                segment.output.display()
            ));
        }
        output
    }
}
