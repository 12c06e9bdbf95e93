//! Artifact packaging and multipart transfer primitives.
//!
//! - [`archive_directory`] packs a build folder into one deflated zip.
//! - [`plan_parts`] / [`open_part`] split a file into the parts implied
//!   by a negotiated set of signed URLs and stream each one from disk.
//! - [`UploadProgress`] and [`PartProgress`] describe per-file progress.

mod archive;
mod checksum;
mod parts;
mod progress;
mod validation;

pub use archive::{ArchiveProgress, archive_directory, archive_directory_blocking};
pub use checksum::calculate_file_checksum;
pub use parts::{PartRange, PartReader, open_part, plan_parts};
pub use progress::{PartProgress, SpeedCalculator, UploadProgress};
pub use validation::validate_object_name;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("source is not a directory: {0}")]
    NotADirectory(String),

    #[error("invalid object name: {0}")]
    InvalidName(String),

    #[error("archive task failed: {0}")]
    Task(String),
}
