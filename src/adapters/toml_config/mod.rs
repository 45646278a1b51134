// TOML config adapter - Configuration file loading and environment overrides

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::{EngineKind, FailurePolicy, QualityTier};
use crate::error::{SplitXError, SplitXResult};

/// Environment variable names, paired with the key each one overrides
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SPLITTER_SEGMENT_LENGTH", "segment_length"),
    ("SPLITTER_QUALITY", "quality"),
    ("SPLITTER_ENGINE", "engine"),
    ("SPLITTER_ON_ERROR", "on_error"),
    ("SPLITTER_FFMPEG", "ffmpeg_path"),
    ("SPLITTER_FFPROBE", "ffprobe_path"),
    ("SPLITTER_PRESET", "preset"),
    ("SPLITTER_AUDIO_BITRATE", "audio_bitrate"),
    ("SPLITTER_LOG_LEVEL", "log_level"),
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Settings shared by every command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Segment length in seconds
    pub segment_length: f64,
    pub quality: QualityTier,
    pub engine: EngineKind,
    /// Explicit failure policy; the engine decides when unset
    pub on_error: Option<FailurePolicy>,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    /// x264 preset
    pub preset: String,
    /// AAC bitrate for the external encoder
    pub audio_bitrate: String,
    pub log_level: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            segment_length: 3.0,
            quality: QualityTier::Medium,
            engine: EngineKind::Ffmpeg,
            on_error: None,
            ffmpeg_path: None,
            ffprobe_path: None,
            preset: "fast".to_string(),
            audio_bitrate: "128k".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// On-disk layout: everything lives under a `splitter` table
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    splitter: SplitterConfig,
}

impl SplitterConfig {
    /// Parse a TOML document with a `[splitter]` table
    pub fn from_toml_str(content: &str) -> SplitXResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| SplitXError::ConfigError {
            message: format!("Failed to parse TOML config: {}", e),
        })?;
        Ok(file.splitter)
    }

    /// Parse a YAML document with a top-level `splitter:` mapping
    pub fn from_yaml_str(content: &str) -> SplitXResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile = serde_yaml::from_str(content).map_err(|e| SplitXError::ConfigError {
            message: format!("Failed to parse YAML config: {}", e),
        })?;
        Ok(file.splitter)
    }

    /// Load a config file, choosing the format by extension
    pub fn load(path: &Path) -> SplitXResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SplitXError::ConfigError {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the explicit file, else the first default location that exists
    ///
    /// Returns the defaults when no file is found; a missing explicit file is
    /// an error.
    pub fn discover(explicit: Option<&Path>) -> SplitXResult<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(SplitXError::ConfigError {
                    message: format!("Config file not found: {}", path.display()),
                });
            }
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        for candidate in default_config_paths() {
            if candidate.is_file() {
                return Ok((Self::load(&candidate)?, Some(candidate)));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok((Self::default(), None))
    }

    /// Apply `SPLITTER_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> SplitXResult<usize> {
        self.apply_env_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup, returning how many applied
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> SplitXResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        for (var, key) in ENV_OVERRIDES {
            let Some(value) = lookup(var) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            self.set(key, &value).map_err(|e| SplitXError::ConfigError {
                message: format!("{}: {}", var, e),
            })?;
            debug!("Environment override: {} = {}", key, value);
            applied += 1;
        }
        Ok(applied)
    }

    /// Set one key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> SplitXResult<()> {
        let value = value.trim();
        match key {
            "segment_length" => {
                self.segment_length = value.parse().map_err(|_| SplitXError::ConfigError {
                    message: format!("segment_length must be a number, got '{}'", value),
                })?;
            }
            "quality" => self.quality = QualityTier::parse(value)?,
            "engine" => self.engine = EngineKind::parse(value)?,
            "on_error" => self.on_error = Some(FailurePolicy::parse(value)?),
            "ffmpeg_path" => self.ffmpeg_path = Some(PathBuf::from(value)),
            "ffprobe_path" => self.ffprobe_path = Some(PathBuf::from(value)),
            "preset" => self.preset = value.to_string(),
            "audio_bitrate" => self.audio_bitrate = value.to_string(),
            "log_level" => self.log_level = value.to_lowercase(),
            other => {
                return Err(SplitXError::ConfigError {
                    message: format!("Unknown configuration key: {}", other),
                })
            }
        }
        Ok(())
    }

    /// Failure policy in effect: the explicit one, else the engine's default
    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_error
            .unwrap_or_else(|| self.engine.default_failure_policy())
    }

    /// Check value ranges after all layers are merged
    pub fn validate(&self) -> SplitXResult<()> {
        if !self.segment_length.is_finite() || self.segment_length <= 0.0 {
            return Err(SplitXError::ConfigError {
                message: format!(
                    "segment_length must be a positive number of seconds, got {}",
                    self.segment_length
                ),
            });
        }
        if self.preset.trim().is_empty() {
            return Err(SplitXError::ConfigError {
                message: "preset must not be empty".to_string(),
            });
        }
        if self.audio_bitrate.trim().is_empty() {
            return Err(SplitXError::ConfigError {
                message: "audio_bitrate must not be empty".to_string(),
            });
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(SplitXError::ConfigError {
                message: format!(
                    "Invalid log level: {}. Valid levels: {}",
                    self.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }
}

/// Locations searched, in order, when no config file is given
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("splitter.toml"), PathBuf::from("splitter.yaml")];

    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
    if let Some(dir) = config_home {
        paths.push(dir.join("splitter").join("config.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SplitterConfig::default();
        assert_eq!(config.segment_length, 3.0);
        assert_eq!(config.quality, QualityTier::Medium);
        assert_eq!(config.engine, EngineKind::Ffmpeg);
        assert_eq!(config.failure_policy(), FailurePolicy::Continue);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_table_keeps_defaults() {
        let config = SplitterConfig::from_toml_str(
            r#"
[splitter]
segment_length = 5.5
quality = "high"
engine = "libav"
"#,
        )
        .unwrap();
        assert_eq!(config.segment_length, 5.5);
        assert_eq!(config.quality, QualityTier::High);
        assert_eq!(config.engine, EngineKind::Libav);
        assert_eq!(config.failure_policy(), FailurePolicy::Abort);
        assert_eq!(config.preset, "fast");
    }

    #[test]
    fn test_yaml_file_by_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("splitter.yaml");
        std::fs::write(
            &path,
            "splitter:\n  quality: low\n  on_error: abort\n  audio_bitrate: 96k\n",
        )
        .unwrap();

        let config = SplitterConfig::load(&path).unwrap();
        assert_eq!(config.quality, QualityTier::Low);
        assert_eq!(config.failure_policy(), FailurePolicy::Abort);
        assert_eq!(config.audio_bitrate, "96k");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = SplitterConfig::from_toml_str("[splitter]\nquality = \"ultra\"\n");
        assert!(matches!(result, Err(SplitXError::ConfigError { .. })));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(matches!(
            SplitterConfig::discover(Some(&missing)),
            Err(SplitXError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SPLITTER_SEGMENT_LENGTH", "10"),
            ("SPLITTER_ENGINE", "library"),
            ("SPLITTER_ON_ERROR", "continue"),
            ("SPLITTER_FFMPEG", "/opt/ffmpeg/bin/ffmpeg"),
        ]
        .into_iter()
        .collect();

        let mut config = SplitterConfig::default();
        let applied = config
            .apply_env_overrides_from(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(applied, 4);
        assert_eq!(config.segment_length, 10.0);
        assert_eq!(config.engine, EngineKind::Libav);
        assert_eq!(config.failure_policy(), FailurePolicy::Continue);
        assert_eq!(config.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
    }

    #[test]
    fn test_env_override_names_bad_variable() {
        let mut config = SplitterConfig::default();
        let err = config
            .apply_env_overrides_from(|name| {
                (name == "SPLITTER_SEGMENT_LENGTH").then(|| "three".to_string())
            })
            .unwrap_err();
        assert!(err.to_string().contains("SPLITTER_SEGMENT_LENGTH"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SplitterConfig::default();
        config.segment_length = 0.0;
        assert!(config.validate().is_err());

        let mut config = SplitterConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
