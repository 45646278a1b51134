//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::adapters::SplitterConfig;
use crate::cli::{Cli, Commands};

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<SplitterConfig> {
    initialize_with_env(cli, |name| std::env::var(name).ok())
}

/// Same as [`initialize_configuration_hierarchy`] with an explicit environment
pub fn initialize_with_env<F>(cli: &Cli, lookup: F) -> Result<SplitterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    // Steps 1 and 2: defaults, then the config file if one is found
    let (mut config, source) = SplitterConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration file")?;
    match &source {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => debug!("No configuration file, using defaults"),
    }

    // Step 3: environment
    let env_overrides = config.apply_env_overrides_from(lookup)?;
    if env_overrides > 0 {
        info!("Applied {} environment variable overrides", env_overrides);
    }

    // Step 4: command line
    let cli_overrides = apply_cli_configuration_overrides(&mut config, cli)?;
    if cli_overrides > 0 {
        info!("Applied {} CLI configuration overrides", cli_overrides);
    }

    config.validate()?;
    Ok(config)
}

/// Apply CLI argument overrides to configuration
fn apply_cli_configuration_overrides(config: &mut SplitterConfig, cli: &Cli) -> Result<usize> {
    let mut overrides: Vec<(&str, String)> = Vec::new();

    if let Some(level) = &cli.log_level {
        overrides.push(("log_level", level.clone()));
    }

    match &cli.command {
        Commands::Split(args) => {
            if let Some(length) = args.segment_length {
                overrides.push(("segment_length", length.to_string()));
            }
            if let Some(quality) = &args.quality {
                overrides.push(("quality", quality.clone()));
            }
            if let Some(engine) = &args.engine {
                overrides.push(("engine", engine.clone()));
            }
            if let Some(policy) = &args.on_error {
                overrides.push(("on_error", policy.clone()));
            }
        }
        Commands::Plan(args) => {
            if let Some(length) = args.segment_length {
                overrides.push(("segment_length", length.to_string()));
            }
        }
        Commands::Check(_) => {}
    }

    for (key, value) in &overrides {
        debug!("CLI override: {} = {}", key, value);
        config.set(key, value)?;
    }
    Ok(overrides.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{EngineKind, FailurePolicy, QualityTier};
    use clap::Parser;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("splitter.toml");
        std::fs::write(
            &file,
            "[splitter]\nsegment_length = 4.0\nquality = \"low\"\npreset = \"slow\"\n",
        )
        .unwrap();
        let file_arg = file.to_string_lossy().to_string();

        let cli = Cli::try_parse_from([
            "splitter", "--config", file_arg.as_str(), "split", "a.mp4", "-o", "out", "-s", "6",
        ])
        .unwrap();
        let config = initialize_with_env(
            &cli,
            env(&[("SPLITTER_SEGMENT_LENGTH", "5"), ("SPLITTER_QUALITY", "high")]),
        )
        .unwrap();

        assert_eq!(config.segment_length, 6.0);
        assert_eq!(config.quality, QualityTier::High);
        assert_eq!(config.preset, "slow");
    }

    #[test]
    fn test_engine_flag_changes_default_policy() {
        let cli = Cli::try_parse_from(["splitter", "split", "a.mp4", "-o", "out", "--engine", "libav"])
            .unwrap();
        let config = initialize_with_env(&cli, env(&[])).unwrap();
        assert_eq!(config.engine, EngineKind::Libav);
        assert_eq!(config.failure_policy(), FailurePolicy::Abort);

        let cli = Cli::try_parse_from([
            "splitter", "split", "a.mp4", "-o", "out", "--engine", "libav", "--on-error", "continue",
        ])
        .unwrap();
        let config = initialize_with_env(&cli, env(&[])).unwrap();
        assert_eq!(config.failure_policy(), FailurePolicy::Continue);
    }

    #[test]
    fn test_invalid_cli_value_is_error() {
        let cli = Cli::try_parse_from(["splitter", "split", "a.mp4", "-o", "out", "-q", "ultra"])
            .unwrap();
        assert!(initialize_with_env(&cli, env(&[])).is_err());

        let cli = Cli::try_parse_from(["splitter", "plan", "a.mp4", "-s", "0"]).unwrap();
        assert!(initialize_with_env(&cli, env(&[])).is_err());
    }
}
