// Upload flow: walks the matched files one by one, works out where each one
// goes and whether it replaces an existing item, then creates or updates it.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{Drive, DriveFile, FileMetadata, UploadMedia};
use crate::config::{expand_pattern, Config};
use crate::mirror::mirror_directories;
use crate::naming::{resolve_name, NameOptions};

/// Shareable viewer link for an uploaded item.
pub fn viewer_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", file_id)
}

/// Everything decided for one local file before it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub path: PathBuf,
    pub name: String,
    pub folder_id: String,
    pub existing: Option<DriveFile>,
    pub mime_type: Option<String>,
}

/// Expand the configured pattern and upload every match, in order.
/// Returns the viewer links of the uploaded files.
pub fn run(config: &Config, drive: &dyn Drive) -> Result<Vec<String>> {
    let files = expand_pattern(&config.filename)?;
    upload_files(config, drive, &files)
}

/// Upload an already expanded list of files. Stops at the first error.
pub fn upload_files(config: &Config, drive: &dyn Drive, files: &[PathBuf]) -> Result<Vec<String>> {
    let explicit_name_used = config.name.is_some()
        && config.name_prefix.is_none()
        && !config.use_complete_source_name;
    if files.len() > 1 && explicit_name_used {
        warn!(
            "Input name is set and {} files matched; all of them will be uploaded as {:?}",
            files.len(),
            config.name.as_deref().unwrap_or_default()
        );
    }
    if config.overwrite {
        info!("Overwrite is enabled.");
    }

    let mut links = Vec::new();
    for path in files {
        if let Some(link) = upload_path(config, drive, path)? {
            info!("Uploaded file: {}", link);
            links.push(link);
        }
    }
    Ok(links)
}

/// Upload one matched path. Directories are skipped and yield `None`.
pub fn upload_path(config: &Config, drive: &dyn Drive, path: &Path) -> Result<Option<String>> {
    let meta = fs::metadata(path)
        .with_context(|| format!("stat of file with filename: {} failed", path.display()))?;
    if meta.is_dir() {
        info!("{} is a directory. skipping upload.", path.display());
        return Ok(None);
    }

    let task = plan_task(config, drive, path)?;
    let file = File::open(path)
        .with_context(|| format!("opening file with filename: {} failed", path.display()))?;
    let media = UploadMedia {
        file,
        len: meta.len(),
        content_type: content_type(path, task.mime_type.as_deref()),
    };

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Uploading {}...", path.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let uploaded = send(drive, &task, media);
    spinner.finish_and_clear();

    let uploaded = uploaded.context("Failed to upload file to Google Drive")?;
    Ok(Some(viewer_link(&uploaded.id)))
}

/// Resolve the destination folder, name and overwrite target of `path`.
pub fn plan_task(config: &Config, drive: &dyn Drive, path: &Path) -> Result<UploadTask> {
    let has_directory = path
        .parent()
        .is_some_and(|p| !p.as_os_str().is_empty() && p != Path::new("."));
    let folder_id = if config.mirror_directory_structure && has_directory {
        mirror_directories(drive, &config.folder_id, path)
            .context("Failed to create directory structure on Google Drive")?
    } else {
        config.folder_id.clone()
    };

    let name = resolve_name(path, &NameOptions::from(config));
    let existing = drive
        .find_by_name(&name, &folder_id)
        .context("Failed to check existing files in the folder")?;

    Ok(UploadTask {
        path: path.to_path_buf(),
        name,
        folder_id,
        existing,
        mime_type: config.mime_type.clone(),
    })
}

fn send(drive: &dyn Drive, task: &UploadTask, media: UploadMedia) -> Result<DriveFile> {
    match &task.existing {
        Some(existing) => {
            let metadata = FileMetadata {
                name: task.name.clone(),
                mime_type: task.mime_type.clone(),
                parents: Vec::new(),
            };
            info!("Updating existing file {} ({})", task.name, existing.id);
            drive.update_file(&existing.id, &task.folder_id, &metadata, media)
        }
        None => {
            let metadata = FileMetadata {
                name: task.name.clone(),
                mime_type: task.mime_type.clone(),
                parents: vec![task.folder_id.clone()],
            };
            drive.create_file(&metadata, media)
        }
    }
}

/// Media content type: the configured override, otherwise a guess from the
/// file extension.
fn content_type(path: &Path, mime_override: Option<&str>) -> String {
    match mime_override {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(path).first_or_octet_stream().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_link_interpolates_id() {
        assert_eq!(viewer_link("abc123"), "https://drive.google.com/file/d/abc123/view");
    }

    #[test]
    fn content_type_prefers_override() {
        let custom = content_type(Path::new("a.txt"), Some("application/x-custom"));
        assert_eq!(custom, "application/x-custom");
        assert_eq!(content_type(Path::new("a.txt"), None), "text/plain");
        assert_eq!(content_type(Path::new("a.unknownext"), None), "application/octet-stream");
    }
}
