//! Command implementations

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::{ExecLibavAdapter, SplitterConfig};
use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::{CheckArgs, PlanArgs, SplitArgs};
use crate::domain::model::{BatchJob, BatchStatus, EngineKind};
use crate::output::progress::{ConsoleRenderer, EventRenderer, JsonRenderer};
use crate::ports::SegmentEncoder;
use crate::utils::path::collect_inputs;
use crate::utils::tools::{check_tool, ToolInfo};

/// Execute the split command and return the terminal batch status
pub async fn split(container: &DefaultAppContainer, args: &SplitArgs) -> Result<BatchStatus> {
    let config = container.config();
    let files = collect_inputs(&args.inputs).context("Failed to collect input files")?;
    info!("Collected {} input files", files.len());

    let job = BatchJob {
        files,
        output_root: args.output.clone(),
        segment_length_seconds: config.segment_length,
        quality: config.quality,
        failure_policy: config.failure_policy(),
    };

    let encoder = container.encoder(config.engine);
    let mut handle = container.batch_runner().start(job, encoder)?;

    let cancel = handle.cancel_flag();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current segment");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let mut renderer: Box<dyn EventRenderer> = if args.json {
        Box::new(JsonRenderer::new(io::stdout()))
    } else {
        Box::new(ConsoleRenderer::new(io::stdout()))
    };

    while let Some(event) = handle.next_event().await {
        if let Err(e) = renderer.render(&event) {
            warn!("Failed to render batch event: {}", e);
        }
    }
    interrupt.abort();

    let summary = handle.wait().await?;
    Ok(summary.status)
}

/// Execute the plan command
pub fn plan(container: &DefaultAppContainer, args: &PlanArgs) -> Result<()> {
    let interactor = container.plan_interactor();
    let preview = interactor
        .preview(&args.input, container.config().segment_length, &args.output)
        .with_context(|| format!("Failed to plan {}", args.input.display()))?;

    let rendered = interactor.format(&preview, &args.format)?;
    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", rendered)?;
    if !rendered.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}

/// Result of the dependency check
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub engine: EngineKind,
    pub tools: Vec<ToolInfo>,
    pub libav_h264: bool,
    /// True when the configured engine can run
    pub ready: bool,
}

/// Gather tool availability for `config`
pub fn check_dependencies(config: &SplitterConfig) -> CheckReport {
    let program = |configured: &Option<PathBuf>, name: &str| {
        configured.clone().unwrap_or_else(|| PathBuf::from(name))
    };

    let ffmpeg = check_tool("ffmpeg", &program(&config.ffmpeg_path, "ffmpeg"));
    let ffprobe = check_tool("ffprobe", &program(&config.ffprobe_path, "ffprobe"));
    let libav_h264 = ExecLibavAdapter::new(config.preset.clone()).preflight().is_ok();

    let ready = match config.engine {
        EngineKind::Ffmpeg => ffmpeg.available,
        EngineKind::Libav => libav_h264,
    };

    CheckReport {
        engine: config.engine,
        tools: vec![ffmpeg, ffprobe],
        libav_h264,
        ready,
    }
}

/// Execute the check command; returns whether the configured engine is usable
pub fn check(config: &SplitterConfig, args: &CheckArgs) -> Result<bool> {
    let report = check_dependencies(config);
    let mut stdout = io::stdout().lock();

    if args.json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(report.ready);
    }

    for tool in &report.tools {
        if tool.available {
            writeln!(
                stdout,
                "✅ {}: {} ({})",
                tool.name,
                tool.version.as_deref().unwrap_or("unknown version"),
                tool.path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "path unknown".to_string())
            )?;
        } else {
            writeln!(stdout, "❌ {}: not found", tool.name)?;
        }
    }
    if report.libav_h264 {
        writeln!(stdout, "✅ libav: H.264 encoder available")?;
    } else {
        writeln!(stdout, "❌ libav: no H.264 encoder in the linked libraries")?;
    }

    writeln!(
        stdout,
        "Engine '{}' is {}",
        report.engine,
        if report.ready { "ready" } else { "not usable" }
    )?;
    Ok(report.ready)
}

/// Process exit code for a finished batch
pub fn exit_code(status: BatchStatus) -> u8 {
    match status {
        BatchStatus::Completed | BatchStatus::CompletedWithWarnings => 0,
        BatchStatus::Failed => 1,
        BatchStatus::Cancelled => 130,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(BatchStatus::Completed), 0);
        assert_eq!(exit_code(BatchStatus::CompletedWithWarnings), 0);
        assert_eq!(exit_code(BatchStatus::Failed), 1);
        assert_eq!(exit_code(BatchStatus::Cancelled), 130);
    }

    #[test]
    fn test_check_reports_missing_configured_tools() {
        let config = SplitterConfig {
            ffmpeg_path: Some(PathBuf::from("/definitely/not/here/ffmpeg")),
            ffprobe_path: Some(PathBuf::from("/definitely/not/here/ffprobe")),
            ..SplitterConfig::default()
        };
        let report = check_dependencies(&config);
        assert!(!report.ready);
        assert!(report.tools.iter().all(|tool| !tool.available));
    }
}
