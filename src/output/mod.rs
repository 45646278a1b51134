//! Output layout and event rendering module
//!
//! Segments land in `{output_root}/{base_name}/{base_name}_segment_{NNN}.mp4`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{SplitXError, SplitXResult};

pub mod progress;

/// Container extension of every segment, whatever the source container
pub const SEGMENT_EXTENSION: &str = "mp4";

/// File stem of a source, used for its subdirectory and segment names
pub fn base_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

/// Directory holding all segments of `source`
pub fn source_output_dir(output_root: &Path, source: &Path) -> PathBuf {
    output_root.join(base_name(source))
}

/// File name of segment `index` (1-based) of `source`
pub fn segment_file_name(source: &Path, index: usize) -> String {
    format!(
        "{}_segment_{:03}.{}",
        base_name(source),
        index,
        SEGMENT_EXTENSION
    )
}

/// Full path of segment `index` (1-based) of `source`
pub fn segment_output_path(output_root: &Path, source: &Path, index: usize) -> PathBuf {
    source_output_dir(output_root, source).join(segment_file_name(source, index))
}

/// Create the per-source output directory if it does not exist yet
pub fn ensure_source_dir(output_root: &Path, source: &Path) -> SplitXResult<PathBuf> {
    let dir = source_output_dir(output_root, source);
    std::fs::create_dir_all(&dir).map_err(|e| SplitXError::OutputError {
        message: format!("Failed to create {}: {}", dir.display(), e),
    })?;
    debug!("Output directory ready: {}", dir.display());
    Ok(dir)
}
