//! CLI module for SplitX
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// SplitX video segment splitter
///
/// Cuts video files into fixed-length MP4 segments, one output directory per
/// source, using either the ffmpeg command-line tool or the linked libav
/// libraries.
#[derive(Parser, Debug)]
#[command(name = "splitter")]
#[command(about = "SplitX - Split videos into fixed-length segments")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Diagnostic log format (pretty, json)
    #[arg(long, default_value = "pretty", global = true)]
    pub log_format: String,

    /// Configuration file (TOML or YAML)
    #[arg(long, global = true, env = "SPLITTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split videos into fixed-length segments
    Split(args::SplitArgs),
    /// Show the segments a split would produce, without encoding
    Plan(args::PlanArgs),
    /// Report whether ffmpeg, ffprobe and libav are usable
    Check(args::CheckArgs),
}
