//! Input path collection

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{SplitXError, SplitXResult};

/// Container extensions accepted when scanning directories
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "wmv", "webm"];

/// Check whether a path has one of the accepted video extensions
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Expand the given inputs into an ordered list of files
///
/// Files are kept as given, in order. Directories are walked and their video
/// files appended in sorted order. Duplicates keep their first position.
pub fn collect_inputs<P: AsRef<Path>>(inputs: &[P]) -> SplitXResult<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| is_video_file(path))
                .collect();
            debug!("Found {} videos under {}", found.len(), input.display());
            for path in found.drain(..) {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        } else if input.is_file() {
            let path = input.to_path_buf();
            if seen.insert(path.clone()) {
                files.push(path);
            }
        } else {
            return Err(SplitXError::InputFileNotFound {
                path: input.display().to_string(),
            });
        }
    }

    Ok(files)
}
