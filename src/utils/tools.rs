//! External tool detection

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{SplitXError, SplitXResult};

/// Information about an external tool
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolInfo {
    /// Name of the tool
    pub name: String,
    /// Whether the tool answered a version query
    pub available: bool,
    /// First line of the version output
    pub version: Option<String>,
    /// Resolved executable path
    pub path: Option<PathBuf>,
}

/// Resolve the executable for `name`, preferring a configured path over PATH lookup
pub fn resolve_tool(name: &str, configured: Option<&Path>) -> SplitXResult<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(SplitXError::DependencyMissing {
            tool: name.to_string(),
            hint: format!("Configured path {} does not exist.", path.display()),
        });
    }

    which::which(name).map_err(|_| SplitXError::tool_missing(name))
}

/// Query `<program> -version` and report what was found
pub fn check_tool(name: &str, program: &Path) -> ToolInfo {
    let result = Command::new(program).arg("-version").output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.trim().to_string());
            debug!("{} responded: {:?}", name, version);

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path: which::which(program).ok(),
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Require that `program` answers a version query
pub fn require_tool(name: &str, program: &Path) -> SplitXResult<ToolInfo> {
    let info = check_tool(name, program);
    if info.available {
        Ok(info)
    } else {
        Err(SplitXError::tool_missing(name))
    }
}
