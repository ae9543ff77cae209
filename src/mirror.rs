// Directory mirroring: recreate the local directory chain of a file as a
// chain of remote folders under the root folder.

use anyhow::{Context, Result};
use std::path::{Component, Path};
use tracing::info;

use crate::api::Drive;

/// Ensure every directory between `root_id` and the file's parent exists
/// remotely and return the id of the deepest one. Existing folders are
/// reused; only missing segments are created. Nothing is cached, so two
/// runs racing on the same path can create duplicates.
pub fn mirror_directories(
    drive: &dyn Drive,
    root_id: &str,
    file_path: &Path,
) -> Result<String> {
    let mut current = root_id.to_string();
    for segment in directory_segments(file_path) {
        current = ensure_folder(drive, &segment, &current).with_context(|| {
            format!("Failed to create directory structure for {}", file_path.display())
        })?;
    }
    Ok(current)
}

/// Directory names of the file's parent after lexical cleaning: `.` is
/// dropped, `..` removes the previous name, and a `..` with nothing left to
/// remove is dropped along with any root or drive prefix.
pub fn directory_segments(file_path: &Path) -> Vec<String> {
    let mut segments = Vec::new();
    let Some(dir) = file_path.parent() else {
        return segments;
    };
    for component in dir.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => {
                segments.pop();
            }
            _ => {}
        }
    }
    segments
}

fn ensure_folder(drive: &dyn Drive, name: &str, parent_id: &str) -> Result<String> {
    let existing = drive
        .find_by_name(name, parent_id)
        .context("failed to check existing folders in the parent folder")?;
    if let Some(folder) = existing {
        return Ok(folder.id);
    }
    let created = drive
        .create_folder(name, parent_id)
        .context("failed to create directory on Google Drive")?;
    info!("Created folder {} ({})", name, created.id);
    Ok(created.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_follow_directory_names() {
        assert_eq!(directory_segments(Path::new("a/b/file.txt")), vec!["a", "b"]);
        assert_eq!(directory_segments(Path::new("./a/./b/file.txt")), vec!["a", "b"]);
        assert_eq!(directory_segments(Path::new("/abs/file.txt")), vec!["abs"]);
        assert!(directory_segments(Path::new("file.txt")).is_empty());
    }

    #[test]
    fn parent_components_are_resolved_lexically() {
        assert_eq!(directory_segments(Path::new("./a/../b/file.txt")), vec!["b"]);
        assert_eq!(directory_segments(Path::new("a/b/../../c/file.txt")), vec!["c"]);
        assert_eq!(directory_segments(Path::new("../dist/x.zip")), vec!["dist"]);
        assert!(directory_segments(Path::new("a/../file.txt")).is_empty());
    }
}
