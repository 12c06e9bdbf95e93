//! Platform packaging: folders flagged `zip` become one archive.

use std::path::{Path, PathBuf};

use hyperplay_transfer::{archive_directory, calculate_file_checksum};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::PublishError;
use crate::types::{PlatformEntry, PlatformSpec, PublishEvent};

/// Where the archive of `platform` is written.
pub fn archive_path(work_dir: &Path, platform: &str) -> PathBuf {
    work_dir.join(format!("{platform}.zip"))
}

/// Resolves the path to upload for one platform, archiving if requested.
pub async fn prepare_entry(
    platform: &str,
    spec: &PlatformSpec,
    work_dir: &Path,
    events: &mpsc::UnboundedSender<PublishEvent>,
) -> Result<PlatformEntry, PublishError> {
    let mut entry = PlatformEntry {
        platform: platform.to_string(),
        path: spec.path.clone(),
        install_script: spec.install_script.clone(),
        executable: spec.executable.clone(),
        archived: false,
    };
    if !spec.zip {
        return Ok(entry);
    }

    tokio::fs::create_dir_all(work_dir).await?;
    let out = archive_path(work_dir, platform);

    let tx = events.clone();
    let key = platform.to_string();
    let size = archive_directory(&spec.path, &out, move |p| {
        let _ = tx.send(PublishEvent::Packaging {
            platform: key.clone(),
            entries_processed: p.entries_processed,
            entries_total: p.entries_total,
        });
    })
    .await?;

    let checksum_path = out.clone();
    match tokio::task::spawn_blocking(move || calculate_file_checksum(&checksum_path)).await {
        Ok(Ok(sha256)) => info!(platform, archive = %out.display(), bytes = size, %sha256, "archive created"),
        Ok(Err(e)) => warn!(platform, error = %e, "could not checksum archive"),
        Err(e) => warn!(platform, error = %e, "checksum task failed"),
    }

    entry.path = out;
    entry.archived = true;
    Ok(entry)
}

/// Deletes a publisher-owned archive; failures are only logged.
pub async fn discard_archive(entry: &PlatformEntry) {
    if !entry.archived {
        return;
    }
    if let Err(e) = tokio::fs::remove_file(&entry.path).await {
        warn!(platform = %entry.platform, path = %entry.path.display(), error = %e, "could not remove archive");
    }
}
