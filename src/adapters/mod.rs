// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod exec_libav;
pub mod probe_ffprobe;
pub mod probe_libav;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::{FFmpegAdapter, FFmpegSettings};
pub use exec_libav::ExecLibavAdapter;
pub use probe_ffprobe::FFprobeAdapter;
pub use probe_libav::ProbeLibavAdapter;
pub use toml_config::SplitterConfig;
pub use tracing_log::{init_tracing, LogFormat};
