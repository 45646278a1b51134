// Tracing log adapter - Subscriber setup for diagnostics on stderr

use tracing_subscriber::EnvFilter;

use crate::error::{SplitXError, SplitXResult};

/// Diagnostic output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse format from string
    pub fn parse(value: &str) -> SplitXResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(SplitXError::ConfigError {
                message: format!("Invalid log format: {}. Valid formats: pretty, json", other),
            }),
        }
    }
}

/// Filter from `RUST_LOG` when set, otherwise from `level`
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber
///
/// Diagnostics always go to stderr; stdout carries only batch output.
/// Calling this twice is harmless, the second call is ignored.
pub fn init_tracing(level: &str, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("Pretty").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::parse("xml").is_err());
    }

    #[test]
    fn test_init_twice_is_ignored() {
        init_tracing("debug", LogFormat::Pretty);
        init_tracing("info", LogFormat::Json);
    }
}
