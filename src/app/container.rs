use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::{ExecLibavAdapter, FFmpegAdapter, FFmpegSettings, FFprobeAdapter, SplitterConfig};
use crate::app::{batch_runner::BatchRunner, plan_interactor::PlanInteractor};
use crate::domain::model::EngineKind;
use crate::error::SplitXResult;
use crate::ports::SegmentEncoder;
use crate::probe::DurationProber;
use crate::utils::tools::resolve_tool;

pub trait AppContainer: Send + Sync {
    fn batch_runner(&self) -> &BatchRunner;
    fn plan_interactor(&self) -> Arc<PlanInteractor>;
    /// Fresh encoder for one batch
    fn encoder(&self, engine: EngineKind) -> Box<dyn SegmentEncoder>;
}

/// Wires adapters to use cases from the merged configuration
pub struct DefaultAppContainer {
    config: SplitterConfig,
    batch_runner: BatchRunner,
    plan_interactor: Arc<PlanInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: SplitterConfig) -> SplitXResult<Self> {
        config.validate()?;

        let ffprobe = tool_program("ffprobe", config.ffprobe_path.as_deref())?;
        // A configured ffmpeg path must exist even for commands that never encode.
        tool_program("ffmpeg", config.ffmpeg_path.as_deref())?;

        let prober = Arc::new(DurationProber::with_default_chain(FFprobeAdapter::with_program(
            ffprobe,
        )));
        let batch_runner = BatchRunner::new(Arc::clone(&prober));
        let plan_interactor = Arc::new(PlanInteractor::new(Arc::clone(&prober)));

        Ok(Self {
            config,
            batch_runner,
            plan_interactor,
        })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    fn ffmpeg_settings(&self) -> FFmpegSettings {
        FFmpegSettings {
            program: tool_program("ffmpeg", self.config.ffmpeg_path.as_deref())
                .unwrap_or_else(|_| PathBuf::from("ffmpeg")),
            preset: self.config.preset.clone(),
            audio_bitrate: self.config.audio_bitrate.clone(),
        }
    }
}

/// Configured path if set, else the PATH match, else the bare name
///
/// A bare name lets the missing tool surface later as a pre-flight error or a
/// probe fallback instead of failing here.
fn tool_program(name: &str, configured: Option<&Path>) -> SplitXResult<PathBuf> {
    match configured {
        Some(_) => resolve_tool(name, configured),
        None => Ok(resolve_tool(name, None).unwrap_or_else(|_| PathBuf::from(name))),
    }
}

impl AppContainer for DefaultAppContainer {
    fn batch_runner(&self) -> &BatchRunner {
        &self.batch_runner
    }

    fn plan_interactor(&self) -> Arc<PlanInteractor> {
        Arc::clone(&self.plan_interactor)
    }

    fn encoder(&self, engine: EngineKind) -> Box<dyn SegmentEncoder> {
        match engine {
            EngineKind::Ffmpeg => Box::new(FFmpegAdapter::new(self.ffmpeg_settings())),
            EngineKind::Libav => Box::new(ExecLibavAdapter::new(self.config.preset.clone())),
        }
    }
}
