//! Batch runner
//!
//! Drives the outer loop over input files and the inner loop over planned
//! intervals. The loop itself is plain synchronous code; [`BatchRunner::start`]
//! moves it onto a single blocking worker and hands the caller a
//! [`BatchHandle`] for events, cancellation and the final summary.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::model::*;
use crate::error::{SplitXError, SplitXResult};
use crate::output::{ensure_source_dir, segment_output_path};
use crate::planner::SegmentPlanner;
use crate::ports::SegmentEncoder;
use crate::probe::DurationProber;

/// Sends batch events to the caller and mirrors log lines into tracing
pub struct Reporter {
    events: mpsc::UnboundedSender<BatchEvent>,
    last_fraction: f64,
}

impl Reporter {
    pub fn new(events: mpsc::UnboundedSender<BatchEvent>) -> Self {
        Self {
            events,
            last_fraction: 0.0,
        }
    }

    fn send(&self, event: BatchEvent) {
        // A caller that stopped listening does not stop the batch.
        let _ = self.events.send(event);
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let line = LogLine::new(level, message);
        match level {
            LogLevel::Info => debug!(batch_log = true, "{}", line.message),
            LogLevel::Warn => warn!(batch_log = true, "{}", line.message),
            LogLevel::Error => error!(batch_log = true, "{}", line.message),
        }
        self.send(BatchEvent::Log { line });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Report a position; the fraction never moves backwards
    pub fn progress(&mut self, progress: BatchProgress) {
        let fraction = progress.fraction().max(self.last_fraction);
        self.last_fraction = fraction;
        self.send(BatchEvent::Progress { progress, fraction });
    }

    /// Force progress to 1.0 and deliver the summary
    pub fn finish(&mut self, summary: &BatchSummary) {
        self.last_fraction = 1.0;
        self.send(BatchEvent::Progress {
            progress: BatchProgress::finished(summary.files_total),
            fraction: 1.0,
        });
        self.send(BatchEvent::Finished {
            summary: summary.clone(),
        });
    }
}

/// Why the batch stopped early
enum Stop {
    Failed(String),
    Cancelled,
}

/// Run every file of `job` in order and return the summary
///
/// Emits log and progress events but not the closing `Finished` event; the
/// caller reports the returned summary with [`Reporter::finish`].
pub fn run_batch(
    job: &BatchJob,
    prober: &DurationProber,
    encoder: &mut dyn SegmentEncoder,
    reporter: &mut Reporter,
    cancel: &AtomicBool,
) -> BatchSummary {
    let mut summary = BatchSummary::new(job.files.len());
    let mut pass = BatchPass {
        job,
        prober,
        planner: SegmentPlanner::new(),
        encoder,
        reporter,
        cancel,
        summary: &mut summary,
    };

    let result = job.validate().map_err(|e| Stop::Failed(e.to_string())).and_then(|_| pass.run());

    match result {
        Ok(()) => {
            pass.reporter.info("All videos processed");
            pass.summary.status = if pass.summary.warnings.is_empty() {
                BatchStatus::Completed
            } else {
                BatchStatus::CompletedWithWarnings
            };
        }
        Err(Stop::Cancelled) => {
            let message = SplitXError::Cancelled.to_string();
            pass.reporter.warn(message.clone());
            pass.summary.status = BatchStatus::Cancelled;
            pass.summary.error = Some(message);
        }
        Err(Stop::Failed(message)) => {
            pass.reporter.error(format!("Error: {}", message));
            pass.summary.status = BatchStatus::Failed;
            pass.summary.error = Some(message);
        }
    }

    info!(
        "Batch ended {:?}: {} segments written, {} failed, {} files skipped",
        summary.status, summary.segments_written, summary.segments_failed, summary.files_skipped
    );
    summary
}

/// State of one run through the batch
struct BatchPass<'a> {
    job: &'a BatchJob,
    prober: &'a DurationProber,
    planner: SegmentPlanner,
    encoder: &'a mut dyn SegmentEncoder,
    reporter: &'a mut Reporter,
    cancel: &'a AtomicBool,
    summary: &'a mut BatchSummary,
}

impl BatchPass<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn run(&mut self) -> Result<(), Stop> {
        let job = self.job;
        let file_count = job.files.len();
        for (position, path) in job.files.iter().enumerate() {
            if self.cancelled() {
                return Err(Stop::Cancelled);
            }
            let file_index = position + 1;
            let result = self.process_file(path, file_index, file_count);
            self.encoder.finish_source(path);
            result?;
        }
        Ok(())
    }

    fn process_file(&mut self, path: &Path, file_index: usize, file_count: usize) -> Result<(), Stop> {
        let name = display_name(path);
        self.reporter
            .info(format!("Processing ({}/{}): {}", file_index, file_count, name));
        self.reporter.info(format!("Probing: {}", name));

        let report = match self.prober.probe(path) {
            Ok(report) => report,
            Err(e) => return self.skip_or_fail(&name, e, file_index, file_count),
        };
        let source = report.source;
        self.reporter
            .info(format!("Duration: {:.2}s", source.duration_seconds));
        if report.used_fallback {
            self.reporter
                .info(format!("Using fallback duration probe ({})", report.strategy));
        }

        // Invalid plan input is a caller bug and always fatal.
        let plan = self
            .planner
            .plan(source.duration_seconds, self.job.segment_length_seconds)
            .map_err(|e| Stop::Failed(e.to_string()))?;

        if let Err(e) = ensure_source_dir(&self.job.output_root, &source.path) {
            return self.skip_or_fail(&name, e, file_index, file_count);
        }

        let segment_count = plan.len();
        self.reporter
            .info(format!("Splitting into {} segments", segment_count));

        for interval in &plan {
            if self.cancelled() {
                return Err(Stop::Cancelled);
            }
            self.encode_interval(&source, interval, segment_count)?;
            self.reporter.progress(BatchProgress::new(
                file_index,
                file_count,
                interval.index,
                segment_count,
            ));
        }

        self.summary.files_processed += 1;
        self.reporter.info(format!("Finished: {}", name));
        Ok(())
    }

    fn encode_interval(
        &mut self,
        source: &SourceVideo,
        interval: &Interval,
        segment_count: usize,
    ) -> Result<(), Stop> {
        self.reporter.info(format!(
            "Encoding segment {}/{} (time: {:.2} - {:.2})",
            interval.index, segment_count, interval.start_seconds, interval.end_seconds
        ));

        let output = segment_output_path(&self.job.output_root, &source.path, interval.index);
        let outcome = self.encoder.encode(EncodeRequest {
            source: source.path.clone(),
            interval: *interval,
            output: output.clone(),
            quality: self.job.quality,
        });

        if outcome.success {
            self.summary.segments_written += 1;
            self.reporter.info(format!(
                "Finished segment {}/{}: {}",
                interval.index,
                segment_count,
                output.display()
            ));
            return Ok(());
        }

        self.summary.segments_failed += 1;
        match self.job.failure_policy {
            FailurePolicy::Abort => {
                let err = SplitXError::EncodeError {
                    index: interval.index,
                    message: format!("{}: {}", display_name(&source.path), outcome.detail),
                };
                Err(Stop::Failed(err.to_string()))
            }
            FailurePolicy::Continue => {
                let warning = format!("Warning: segment {} failed: {}", interval.index, outcome.detail);
                self.reporter.warn(warning.clone());
                self.summary.warnings.push(warning);
                Ok(())
            }
        }
    }

    /// Per-file failure: skip the file under Continue, stop the batch under Abort
    fn skip_or_fail(
        &mut self,
        name: &str,
        err: SplitXError,
        file_index: usize,
        file_count: usize,
    ) -> Result<(), Stop> {
        match self.job.failure_policy {
            FailurePolicy::Abort => Err(Stop::Failed(err.to_string())),
            FailurePolicy::Continue => {
                let warning = format!("Warning: skipping {}: {}", name, err);
                self.reporter.warn(warning.clone());
                self.summary.warnings.push(warning);
                self.summary.files_skipped += 1;
                self.reporter
                    .progress(BatchProgress::file_done(file_index, file_count));
                Ok(())
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Resets the busy flag when dropped
struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(busy: &Arc<AtomicBool>) -> SplitXResult<Self> {
        busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SplitXError::AlreadyRunning)?;
        Ok(Self {
            busy: Arc::clone(busy),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Starts batches, one at a time
pub struct BatchRunner {
    busy: Arc<AtomicBool>,
    prober: Arc<DurationProber>,
}

impl BatchRunner {
    pub fn new(prober: impl Into<Arc<DurationProber>>) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            prober: prober.into(),
        }
    }

    /// True between a successful `start` and the worker's exit
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start `job` on a background worker
    ///
    /// Fails with [`SplitXError::AlreadyRunning`] while another batch is in
    /// flight, and with the encoder's pre-flight error before any work starts.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, job: BatchJob, mut encoder: Box<dyn SegmentEncoder>) -> SplitXResult<BatchHandle> {
        let guard = BusyGuard::acquire(&self.busy)?;
        job.validate()?;
        encoder.preflight()?;

        info!(
            "Starting batch: {} files, {:.1}s segments, quality {}, engine {}, on error {}",
            job.files.len(),
            job.segment_length_seconds,
            job.quality,
            encoder.name(),
            job.failure_policy
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);
        let prober = Arc::clone(&self.prober);

        let worker = tokio::task::spawn_blocking(move || {
            let mut reporter = Reporter::new(tx);
            let summary = run_batch(&job, &prober, encoder.as_mut(), &mut reporter, &worker_cancel);
            // Idle before the caller sees the summary.
            drop(guard);
            reporter.finish(&summary);
            summary
        });

        Ok(BatchHandle {
            events: rx,
            cancel,
            worker,
        })
    }
}

/// Caller side of a running batch
pub struct BatchHandle {
    events: mpsc::UnboundedReceiver<BatchEvent>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Next event, or `None` once the worker has exited
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Ask the worker to stop before its next segment
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Shared cancel flag, for wiring into signal handlers
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Wait for the worker and return its summary
    pub async fn wait(self) -> SplitXResult<BatchSummary> {
        self.worker.await.map_err(|e| SplitXError::WorkerError {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests;
