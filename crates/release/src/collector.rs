//! Upload unit collection.
//!
//! A multi-file platform folder is walked with an explicit stack and
//! yields one unit per regular file, named by its `/`-separated path
//! relative to the folder. Any other platform yields exactly one unit.

use std::path::{Path, PathBuf};

use hyperplay_protocol::constants::FALLBACK_MIME_TYPE;
use hyperplay_transfer::validate_object_name;
use tracing::{debug, warn};

use crate::error::PublishError;
use crate::types::UploadUnit;

/// Resolves the upload units of one platform.
///
/// Sizes are read from the filesystem now; files changing afterwards
/// are not detected.
pub fn collect_units(
    platform: &str,
    path: &Path,
    multi_file_platform: &str,
) -> Result<Vec<UploadUnit>, PublishError> {
    let metadata = std::fs::metadata(path)?;

    if platform == multi_file_platform && metadata.is_dir() {
        let units = walk_folder(path)?;
        debug!(
            platform,
            files = units.len(),
            bytes = units.iter().map(|u| u.size).sum::<u64>(),
            "folder collected"
        );
        return Ok(units);
    }

    if !metadata.is_file() {
        return Err(PublishError::NotAFile {
            platform: platform.to_string(),
            path: path.display().to_string(),
        });
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PublishError::NotAFile {
            platform: platform.to_string(),
            path: path.display().to_string(),
        })?;

    Ok(vec![UploadUnit {
        mime_type: mime_type(path),
        file_name,
        path: path.to_path_buf(),
        size: metadata.len(),
    }])
}

/// MIME type guessed from the extension.
pub fn mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
}

fn walk_folder(root: &Path) -> Result<Vec<UploadUnit>, PublishError> {
    let mut units = Vec::new();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                let rel = path.strip_prefix(root).map_err(std::io::Error::other)?;
                let name = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                validate_object_name(&name)?;

                units.push(UploadUnit {
                    size: entry.metadata()?.len(),
                    mime_type: mime_type(&path),
                    file_name: name,
                    path,
                });
            } else {
                warn!(path = %path.display(), "skipping non-regular file");
            }
        }
    }

    units.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(units)
}
