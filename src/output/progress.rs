//! Rendering of batch events for the terminal

use std::io::Write;

use crate::domain::model::{BatchEvent, BatchStatus, BatchSummary};

/// Caller-side sink for batch events
pub trait EventRenderer: Send {
    /// Render one event
    fn render(&mut self, event: &BatchEvent) -> std::io::Result<()>;
}

/// Human-readable progress bar and log output
pub struct ConsoleRenderer<W: Write> {
    out: W,
    bar_length: usize,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, bar_length: 20 }
    }

    fn bar(&self, fraction: f64) -> String {
        let filled = ((fraction.clamp(0.0, 1.0)) * self.bar_length as f64).round() as usize;
        "█".repeat(filled) + &"░".repeat(self.bar_length - filled)
    }

    fn render_summary(&mut self, summary: &BatchSummary) -> std::io::Result<()> {
        match summary.status {
            BatchStatus::Completed => writeln!(
                self.out,
                "✅ Done: {} files, {} segments written",
                summary.files_processed, summary.segments_written
            ),
            BatchStatus::CompletedWithWarnings => {
                writeln!(
                    self.out,
                    "⚠️  Done with {} warnings: {} segments written, {} failed, {} files skipped",
                    summary.warnings.len(),
                    summary.segments_written,
                    summary.segments_failed,
                    summary.files_skipped
                )?;
                for warning in &summary.warnings {
                    writeln!(self.out, "   - {}", warning)?;
                }
                Ok(())
            }
            BatchStatus::Failed => writeln!(
                self.out,
                "❌ Failed: {}",
                summary.error.as_deref().unwrap_or("unknown error")
            ),
            BatchStatus::Cancelled => writeln!(
                self.out,
                "⚠️  Cancelled after {} segments",
                summary.segments_written
            ),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> EventRenderer for ConsoleRenderer<W> {
    fn render(&mut self, event: &BatchEvent) -> std::io::Result<()> {
        match event {
            BatchEvent::Progress { fraction, .. } => {
                let bar = self.bar(*fraction);
                writeln!(self.out, "🔄 [{}] {:>5.1}%", bar, fraction * 100.0)?;
            }
            BatchEvent::Log { line } => writeln!(self.out, "{}", line)?,
            BatchEvent::Finished { summary } => self.render_summary(summary)?,
        }
        self.out.flush()
    }
}

/// One JSON object per event, for scripts
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> EventRenderer for JsonRenderer<W> {
    fn render(&mut self, event: &BatchEvent) -> std::io::Result<()> {
        let json = serde_json::to_string(event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.out, "{}", json)?;
        self.out.flush()
    }
}
