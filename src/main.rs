//! SplitX video segment splitter
//!
//! Cuts each input video into fixed-length MP4 segments under
//! `<output>/<name>/<name>_segment_NNN.mp4`.
//!
//! # Usage
//!
//! ```bash
//! splitter split movie.mp4 holiday.mov -o segments -s 3 -q high
//! splitter split ./videos -o segments --engine libav --on-error continue
//! splitter plan movie.mp4 -s 2.5
//! splitter check
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use splitx_cli::adapters::{init_tracing, LogFormat};
use splitx_cli::app::DefaultAppContainer;
use splitx_cli::cli::{commands, Cli, Commands};
use splitx_cli::config_initialization::initialize_configuration_hierarchy;

/// Main entry point for the SplitX CLI application
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = initialize_configuration_hierarchy(&cli)?;
    init_tracing(&config.log_level, LogFormat::parse(&cli.log_format)?);
    splitx_cli::init()?;

    info!("Starting SplitX {}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Split(args) => {
            info!("Executing split command");
            let container = DefaultAppContainer::new(config)?;
            let status = commands::split(&container, args).await?;
            Ok(ExitCode::from(commands::exit_code(status)))
        }
        Commands::Plan(args) => {
            info!("Executing plan command");
            let container = DefaultAppContainer::new(config)?;
            commands::plan(&container, args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check(args) => {
            info!("Executing check command");
            let ready = commands::check(&config, args)?;
            Ok(if ready { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}
