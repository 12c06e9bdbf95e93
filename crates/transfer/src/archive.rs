//! Directory archiving.
//!
//! Packs a build folder into a single deflated zip. Entry names are
//! relative to the source directory (the root itself is flattened away)
//! and always use `/` as separator.

use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::TransferError;

/// Compression level passed to deflate (maximum).
const COMPRESSION_LEVEL: i64 = 9;

/// Files at or above this size need zip64 extensions.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Advisory progress of an archive run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveProgress {
    pub entries_processed: u64,
    pub entries_total: u64,
    pub bytes_processed: u64,
    pub bytes_total: u64,
}

#[derive(Debug)]
enum EntryKind {
    Dir,
    File { size: u64, mode: Option<u32> },
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    name: String,
    kind: EntryKind,
}

/// Archives `source_dir` into `out_path` and returns the archive size in bytes.
///
/// `on_progress` is called once per processed entry. The callback is
/// owned by this call and dropped when it returns, on success and on
/// failure alike. A partially written archive is removed on failure.
pub async fn archive_directory<F>(
    source_dir: &Path,
    out_path: &Path,
    on_progress: F,
) -> Result<u64, TransferError>
where
    F: FnMut(&ArchiveProgress) + Send + 'static,
{
    let source = source_dir.to_path_buf();
    let out = out_path.to_path_buf();

    tokio::task::spawn_blocking(move || archive_directory_blocking(&source, &out, on_progress))
        .await
        .map_err(|e| TransferError::Task(e.to_string()))?
}

/// Blocking variant of [`archive_directory`].
pub fn archive_directory_blocking<F>(
    source_dir: &Path,
    out_path: &Path,
    mut on_progress: F,
) -> Result<u64, TransferError>
where
    F: FnMut(&ArchiveProgress),
{
    if !source_dir.is_dir() {
        return Err(TransferError::NotADirectory(
            source_dir.display().to_string(),
        ));
    }

    let entries = collect_entries(source_dir, out_path)?;
    let mut progress = ArchiveProgress {
        entries_total: entries.len() as u64,
        bytes_total: entries
            .iter()
            .map(|e| match e.kind {
                EntryKind::File { size, .. } => size,
                EntryKind::Dir => 0,
            })
            .sum(),
        ..Default::default()
    };

    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut guard = PartialArchive::new(out_path);
    let mut writer = ZipWriter::new(File::create(out_path)?);

    for entry in &entries {
        match entry.kind {
            EntryKind::Dir => {
                writer.add_directory(entry.name.as_str(), base_options())?;
            }
            EntryKind::File { size, mode } => {
                let mut source = match File::open(&entry.path) {
                    Ok(f) => f,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        warn!(entry = %entry.name, "entry vanished during archiving, skipping");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

                let mut options = base_options().large_file(size >= ZIP64_THRESHOLD);
                if let Some(mode) = mode {
                    options = options.unix_permissions(mode);
                }
                writer.start_file(entry.name.as_str(), options)?;
                io::copy(&mut source, &mut writer)?;
                progress.bytes_processed += size;
            }
        }

        progress.entries_processed += 1;
        debug!(
            entries = progress.entries_processed,
            entries_total = progress.entries_total,
            bytes = progress.bytes_processed,
            bytes_total = progress.bytes_total,
            "archive progress"
        );
        on_progress(&progress);
    }

    let file = writer.finish()?;
    file.sync_all()?;
    let size = file.metadata()?.len();
    guard.disarm();

    info!(
        path = %out_path.display(),
        entries = progress.entries_total,
        bytes = size,
        "archive created"
    );
    Ok(size)
}

fn base_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
}

/// Lists every directory and file below `root`, depth-first with an
/// explicit stack, sorted per directory for stable output.
fn collect_entries(root: &Path, out_path: &Path) -> Result<Vec<Entry>, TransferError> {
    let skip = std::fs::canonicalize(out_path).ok();
    let mut entries = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut children = std::fs::read_dir(&dir)?.collect::<Result<Vec<_>, _>>()?;
        children.sort_by_key(|c| c.file_name());

        let mut subdirs = Vec::new();
        for child in children {
            let path = child.path();
            let metadata = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    // Dangling symlink or a file removed mid-walk.
                    warn!(path = %path.display(), "missing entry, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if skip.is_some() && std::fs::canonicalize(&path).ok() == skip {
                continue;
            }

            let name = entry_name(root, &path)?;
            if metadata.is_dir() {
                if child.file_type()?.is_symlink() {
                    warn!(path = %path.display(), "skipping symlinked directory");
                    continue;
                }
                entries.push(Entry {
                    path: path.clone(),
                    name: format!("{name}/"),
                    kind: EntryKind::Dir,
                });
                subdirs.push(path);
            } else if metadata.is_file() {
                entries.push(Entry {
                    path,
                    name,
                    kind: EntryKind::File {
                        size: metadata.len(),
                        mode: file_mode(&metadata),
                    },
                });
            } else {
                warn!(path = %path.display(), "skipping special file");
            }
        }

        // Reverse so the first subdirectory is popped first.
        stack.extend(subdirs.into_iter().rev());
    }

    Ok(entries)
}

fn entry_name(root: &Path, path: &Path) -> Result<String, TransferError> {
    let rel = path.strip_prefix(root).map_err(io::Error::other)?;
    Ok(rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}

/// Removes the output file on drop unless disarmed.
struct PartialArchive<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialArchive<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialArchive<'_> {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = std::fs::remove_file(self.path)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "failed to remove partial archive");
        }
    }
}
