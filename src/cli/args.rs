//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Video files or directories to split, processed in order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output root; each source gets its own subdirectory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Segment length in seconds (default: 3.0)
    #[arg(short = 's', long)]
    pub segment_length: Option<f64>,

    /// Quality tier: low, medium, high
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Encoder: ffmpeg (external tool) or libav (in-process)
    #[arg(long)]
    pub engine: Option<String>,

    /// Failure policy: abort or continue (default depends on the engine)
    #[arg(long)]
    pub on_error: Option<String>,

    /// Print every batch event as one JSON line on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Video file to plan
    pub input: PathBuf,

    /// Segment length in seconds (default: 3.0)
    #[arg(short = 's', long)]
    pub segment_length: Option<f64>,

    /// Output root used for the listed file names
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Output format: text, json, yaml
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
