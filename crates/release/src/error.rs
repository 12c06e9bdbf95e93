//! Publish error types.

use hyperplay_api::ApiError;
use hyperplay_transfer::TransferError;

/// Errors produced while publishing a release.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("invalid release config: {0}")]
    InvalidConfig(String),

    #[error("platform {platform}: {path} is not a file; set `zip = true` to upload a folder")]
    NotAFile { platform: String, path: String },

    #[error("platform {platform}: no upload descriptor returned for {file}")]
    MissingDescriptor { platform: String, file: String },

    #[error("platform {platform}: no part URLs issued for {file}")]
    NoPartUrls { platform: String, file: String },

    /// One part of a file failed; the file was not completed.
    #[error("platform {platform}: upload of {file} failed at part {part}: {source}")]
    PartUpload {
        platform: String,
        file: String,
        part: u32,
        #[source]
        source: ApiError,
    },

    /// Completion succeeded but named no location for the object.
    #[error("platform {platform}: no location returned for {file}")]
    MissingLocation { platform: String, file: String },

    #[error(
        "channel `{requested}` not found; available channels: {}",
        format_available(.available)
    )]
    UnknownChannel {
        requested: String,
        available: Vec<String>,
    },

    #[error("{} platform(s) failed: {}", .0.len(), format_failures(.0))]
    PlatformsFailed(Vec<PlatformFailure>),

    #[error("cancelled")]
    Cancelled,
}

impl PublishError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A platform that did not make it into the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformFailure {
    pub platform: String,
    pub error: String,
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".into()
    } else {
        available.join(", ")
    }
}

fn format_failures(failures: &[PlatformFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.platform, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
