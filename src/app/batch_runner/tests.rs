use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use super::*;
use crate::ports::DurationSource;

/// Durations looked up by file name
struct FixedDurations(HashMap<String, f64>);

impl FixedDurations {
    fn new(entries: &[(&str, f64)]) -> Self {
        Self(entries.iter().map(|(n, d)| (n.to_string(), *d)).collect())
    }
}

impl DurationSource for FixedDurations {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn probe_duration(&self, path: &Path) -> SplitXResult<f64> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.0.get(&name).copied().ok_or_else(|| SplitXError::ProbeError {
            path: path.display().to_string(),
            message: "unknown file".to_string(),
        })
    }
}

fn prober(entries: &[(&str, f64)]) -> DurationProber {
    DurationProber::new(vec![Box::new(FixedDurations::new(entries))])
}

/// Records every request; fails the (file name, index) pairs it is told to
#[derive(Default)]
struct ScriptedEncoder {
    fail: HashSet<(String, usize)>,
    requests: Arc<Mutex<Vec<EncodeRequest>>>,
    finished: Arc<Mutex<Vec<PathBuf>>>,
    missing_tool: bool,
}

impl SegmentEncoder for ScriptedEncoder {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn preflight(&mut self) -> SplitXResult<()> {
        if self.missing_tool {
            return Err(SplitXError::tool_missing("ffmpeg"));
        }
        Ok(())
    }

    fn encode(&mut self, request: EncodeRequest) -> EncodeOutcome {
        let name = request.source.file_name().unwrap().to_string_lossy().to_string();
        let index = request.interval.index;
        self.requests.lock().unwrap().push(request);
        if self.fail.contains(&(name, index)) {
            EncodeOutcome::failed(index, "exit status 1: Invalid data")
        } else {
            EncodeOutcome::succeeded(index)
        }
    }

    fn finish_source(&mut self, source: &Path) {
        self.finished.lock().unwrap().push(source.to_path_buf());
    }
}

/// Blocks inside `encode` until released
struct GatedEncoder {
    entered: std_mpsc::Sender<()>,
    release: std_mpsc::Receiver<()>,
}

impl SegmentEncoder for GatedEncoder {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn encode(&mut self, request: EncodeRequest) -> EncodeOutcome {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        EncodeOutcome::succeeded(request.interval.index)
    }
}

fn job(temp: &TempDir, files: &[&str], policy: FailurePolicy) -> BatchJob {
    BatchJob {
        files: files.iter().map(|f| PathBuf::from("/videos").join(f)).collect(),
        output_root: temp.path().to_path_buf(),
        segment_length_seconds: 3.0,
        quality: QualityTier::Medium,
        failure_policy: policy,
    }
}

/// Run synchronously and collect every event, including the closing ones
fn run_collect(
    job: &BatchJob,
    prober: &DurationProber,
    encoder: &mut dyn SegmentEncoder,
) -> (BatchSummary, Vec<BatchEvent>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut reporter = Reporter::new(tx);
    let cancel = AtomicBool::new(false);
    let summary = run_batch(job, prober, encoder, &mut reporter, &cancel);
    reporter.finish(&summary);
    drop(reporter);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (summary, events)
}

fn fractions(events: &[BatchEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Progress { fraction, .. } => Some(*fraction),
            _ => None,
        })
        .collect()
}

fn messages(events: &[BatchEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Log { line } => Some(line.message.clone()),
            _ => None,
        })
        .collect()
}

fn assert_closes_at_one(events: &[BatchEvent]) {
    let all = fractions(events);
    assert!(all.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {:?}", all);
    assert_eq!(*all.last().unwrap(), 1.0);
    assert!(matches!(events.last(), Some(BatchEvent::Finished { .. })));
}

#[test]
fn test_two_files_progress() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp, &["a.mp4", "b.mp4"], FailurePolicy::Continue);
    let prober = prober(&[("a.mp4", 9.0), ("b.mp4", 6.0)]);
    let mut encoder = ScriptedEncoder::default();

    let (summary, events) = run_collect(&job, &prober, &mut encoder);

    assert_eq!(summary.status, BatchStatus::Completed);
    assert_eq!(summary.segments_written, 5);
    assert_eq!(summary.files_processed, 2);

    let seen = fractions(&events);
    // Three segments of the first file, two of the second, then the forced final update.
    assert_eq!(seen.len(), 6);
    assert_eq!(seen[2], 0.5);
    assert_eq!(seen[3], 0.75);
    assert_eq!(seen[4], 1.0);
    assert_closes_at_one(&events);

    assert!(temp.path().join("a").is_dir());
    assert!(temp.path().join("b").is_dir());
}

#[test]
fn test_requests_and_log_lines() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp, &["movie.mp4"], FailurePolicy::Continue);
    let prober = prober(&[("movie.mp4", 7.0)]);
    let mut encoder = ScriptedEncoder::default();
    let requests = Arc::clone(&encoder.requests);
    let finished = Arc::clone(&encoder.finished);

    let (_, events) = run_collect(&job, &prober, &mut encoder);

    let requests = requests.lock().unwrap();
    let spans: Vec<(usize, f64, f64)> = requests
        .iter()
        .map(|r| (r.interval.index, r.interval.start_seconds, r.interval.end_seconds))
        .collect();
    assert_eq!(spans, vec![(1, 0.0, 3.0), (2, 3.0, 6.0), (3, 6.0, 7.0)]);
    assert_eq!(
        requests[2].output,
        temp.path().join("movie").join("movie_segment_003.mp4")
    );
    assert_eq!(*finished.lock().unwrap(), vec![PathBuf::from("/videos/movie.mp4")]);

    let log = messages(&events);
    assert_eq!(log[0], "Processing (1/1): movie.mp4");
    assert!(log.contains(&"Duration: 7.00s".to_string()));
    assert!(log.contains(&"Splitting into 3 segments".to_string()));
    assert!(log.contains(&"Encoding segment 3/3 (time: 6.00 - 7.00)".to_string()));
    assert!(log.contains(&"Finished: movie.mp4".to_string()));
    assert_eq!(log.last().unwrap(), "All videos processed");
}

#[test]
fn test_continue_policy_keeps_going_after_segment_failure() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp, &["a.mp4", "b.mp4"], FailurePolicy::Continue);
    let prober = prober(&[("a.mp4", 9.0), ("b.mp4", 6.0)]);
    let mut encoder = ScriptedEncoder {
        fail: [("a.mp4".to_string(), 2)].into_iter().collect(),
        ..ScriptedEncoder::default()
    };
    let requests = Arc::clone(&encoder.requests);

    let (summary, events) = run_collect(&job, &prober, &mut encoder);

    assert_eq!(summary.status, BatchStatus::CompletedWithWarnings);
    assert!(summary.status.is_success());
    assert_eq!(summary.segments_written, 4);
    assert_eq!(summary.segments_failed, 1);
    assert_eq!(requests.lock().unwrap().len(), 5);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].starts_with("Warning: segment 2 failed"));
    assert_closes_at_one(&events);
}

#[test]
fn test_abort_policy_stops_batch_on_segment_failure() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp, &["a.mp4", "b.mp4"], FailurePolicy::Abort);
    let prober = prober(&[("a.mp4", 9.0), ("b.mp4", 6.0)]);
    let mut encoder = ScriptedEncoder {
        fail: [("a.mp4".to_string(), 2)].into_iter().collect(),
        ..ScriptedEncoder::default()
    };
    let requests = Arc::clone(&encoder.requests);
    let finished = Arc::clone(&encoder.finished);

    let (summary, events) = run_collect(&job, &prober, &mut encoder);

    assert_eq!(summary.status, BatchStatus::Failed);
    assert_eq!(requests.lock().unwrap().len(), 2);
    assert!(summary.error.as_deref().unwrap().contains("Invalid data"));
    // The failing source is still released.
    assert_eq!(finished.lock().unwrap().len(), 1);
    assert!(!temp.path().join("b").exists());
    assert_closes_at_one(&events);
}

#[test]
fn test_probe_failure_follows_policy() {
    let temp = TempDir::new().unwrap();
    let prober = prober(&[("b.mp4", 3.0)]);

    let continuing = job(&temp, &["missing.mp4", "b.mp4"], FailurePolicy::Continue);
    let (summary, events) = run_collect(&continuing, &prober, &mut ScriptedEncoder::default());
    assert_eq!(summary.status, BatchStatus::CompletedWithWarnings);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.files_processed, 1);
    assert_eq!(fractions(&events)[0], 0.5);

    let aborting = job(&temp, &["missing.mp4", "b.mp4"], FailurePolicy::Abort);
    let (summary, events) = run_collect(&aborting, &prober, &mut ScriptedEncoder::default());
    assert_eq!(summary.status, BatchStatus::Failed);
    assert_eq!(summary.files_processed, 0);
    assert!(summary.error.as_deref().unwrap().contains("missing.mp4"));
    assert_closes_at_one(&events);
}

#[test]
fn test_cancel_before_start() {
    let temp = TempDir::new().unwrap();
    let job = job(&temp, &["a.mp4"], FailurePolicy::Continue);
    let prober = prober(&[("a.mp4", 9.0)]);
    let mut encoder = ScriptedEncoder::default();
    let requests = Arc::clone(&encoder.requests);

    let (tx, _rx) = mpsc::unbounded_channel();
    let mut reporter = Reporter::new(tx);
    let cancel = AtomicBool::new(true);
    let summary = run_batch(&job, &prober, &mut encoder, &mut reporter, &cancel);

    assert_eq!(summary.status, BatchStatus::Cancelled);
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_delivers_events_and_summary() {
    let temp = TempDir::new().unwrap();
    let runner = BatchRunner::new(prober(&[("a.mp4", 9.0), ("b.mp4", 6.0)]));
    let mut handle = runner
        .start(
            job(&temp, &["a.mp4", "b.mp4"], FailurePolicy::Continue),
            Box::new(ScriptedEncoder::default()),
        )
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.segments_written, 5);
    assert_closes_at_one(&events);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let temp = TempDir::new().unwrap();
    let runner = BatchRunner::new(prober(&[("a.mp4", 3.0)]));
    let (entered_tx, entered_rx) = std_mpsc::channel();
    let (release_tx, release_rx) = std_mpsc::channel();

    let handle = runner
        .start(
            job(&temp, &["a.mp4"], FailurePolicy::Continue),
            Box::new(GatedEncoder {
                entered: entered_tx,
                release: release_rx,
            }),
        )
        .unwrap();

    tokio::task::spawn_blocking(move || entered_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(runner.is_running());

    let second = runner.start(
        job(&temp, &["a.mp4"], FailurePolicy::Continue),
        Box::new(ScriptedEncoder::default()),
    );
    assert!(matches!(second, Err(SplitXError::AlreadyRunning)));

    release_tx.send(()).unwrap();
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.status, BatchStatus::Completed);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_runner_is_idle_after_failures() {
    let temp = TempDir::new().unwrap();
    let runner = BatchRunner::new(prober(&[("a.mp4", 3.0)]));

    let missing = runner.start(
        job(&temp, &["a.mp4"], FailurePolicy::Continue),
        Box::new(ScriptedEncoder {
            missing_tool: true,
            ..ScriptedEncoder::default()
        }),
    );
    assert!(matches!(missing, Err(SplitXError::DependencyMissing { .. })));
    assert!(!runner.is_running());

    let empty = runner.start(
        job(&temp, &[], FailurePolicy::Continue),
        Box::new(ScriptedEncoder::default()),
    );
    assert!(matches!(empty, Err(SplitXError::NoInputFiles)));
    assert!(!runner.is_running());

    let handle = runner
        .start(
            job(&temp, &["a.mp4"], FailurePolicy::Abort),
            Box::new(ScriptedEncoder {
                fail: [("a.mp4".to_string(), 1)].into_iter().collect(),
                ..ScriptedEncoder::default()
            }),
        )
        .unwrap();
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.status, BatchStatus::Failed);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_cancel_between_segments() {
    let temp = TempDir::new().unwrap();
    let runner = BatchRunner::new(prober(&[("a.mp4", 9.0)]));
    let (entered_tx, entered_rx) = std_mpsc::channel();
    let (release_tx, release_rx) = std_mpsc::channel();

    let handle = runner
        .start(
            job(&temp, &["a.mp4"], FailurePolicy::Continue),
            Box::new(GatedEncoder {
                entered: entered_tx,
                release: release_rx,
            }),
        )
        .unwrap();

    tokio::task::spawn_blocking(move || entered_rx.recv())
        .await
        .unwrap()
        .unwrap();
    handle.cancel();
    release_tx.send(()).unwrap();

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.status, BatchStatus::Cancelled);
    assert_eq!(summary.segments_written, 1);
}
