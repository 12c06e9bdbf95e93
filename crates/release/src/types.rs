//! Publish domain types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use hyperplay_protocol::constants::MULTI_FILE_PLATFORM;
use hyperplay_protocol::release_path;
use hyperplay_transfer::{UploadProgress, validate_object_name};
use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// Release manifest as authored by the developer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseConfig {
    pub account: String,
    pub project: String,
    pub release: String,
    #[serde(default)]
    pub description: String,
    pub platforms: BTreeMap<String, PlatformSpec>,
    /// Channel to submit the release to once published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Project identifier used to look up channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl ReleaseConfig {
    pub fn id(&self) -> ReleaseId {
        ReleaseId {
            account: self.account.clone(),
            project: self.project.clone(),
            release: self.release.clone(),
        }
    }

    /// Checks that every name needed to address the release is present.
    ///
    /// The release name and platform keys also name local files (the
    /// metadata output and the archives), so they must be single path
    /// segments.
    pub fn validate(&self) -> Result<(), PublishError> {
        for (field, value) in [
            ("account", &self.account),
            ("project", &self.project),
            ("release", &self.release),
        ] {
            if value.trim().is_empty() {
                return Err(PublishError::InvalidConfig(format!("`{field}` is empty")));
            }
        }
        single_segment("release", &self.release)?;
        for (key, spec) in &self.platforms {
            if key.trim().is_empty() {
                return Err(PublishError::InvalidConfig("empty platform key".into()));
            }
            single_segment("platform key", key)?;
            if spec.path.as_os_str().is_empty() {
                return Err(PublishError::InvalidConfig(format!(
                    "platform {key} has no path"
                )));
            }
        }
        Ok(())
    }
}

fn single_segment(what: &str, value: &str) -> Result<(), PublishError> {
    if value.contains('/') {
        return Err(PublishError::InvalidConfig(format!(
            "{what} `{value}` must not contain `/`"
        )));
    }
    validate_object_name(value)
        .map_err(|e| PublishError::InvalidConfig(format!("{what} `{value}`: {e}")))
}

/// Build input of one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    /// Archive `path` (a folder) before uploading.
    #[serde(default)]
    pub zip: bool,
}

/// `account/project/release` triple addressing a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseId {
    pub account: String,
    pub project: String,
    pub release: String,
}

impl ReleaseId {
    pub fn path(&self) -> String {
        release_path(&self.account, &self.project, &self.release)
    }
}

/// A platform resolved to the path that is actually uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformEntry {
    pub platform: String,
    /// The configured path, or the archive built from it.
    pub path: PathBuf,
    pub install_script: Option<String>,
    pub executable: Option<String>,
    /// True when `path` is an archive owned by the publisher.
    pub archived: bool,
}

/// One file announced and uploaded as a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadUnit {
    /// Object name; relative `/`-separated path for multi-file platforms.
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub mime_type: String,
}

/// Runtime knobs of a publish run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Where archives are written.
    pub work_dir: PathBuf,
    /// Prefix for completion locations that are paths.
    pub gateway_url: String,
    /// Parts of one file in flight at once.
    pub part_concurrency: usize,
    /// Platforms processed at once.
    pub platform_concurrency: usize,
    /// Platform key uploaded file by file.
    pub multi_file_platform: String,
    pub keep_archives: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("hyperplay-publish"),
            gateway_url: "https://gateway-b3.valist.io".into(),
            part_concurrency: 4,
            platform_concurrency: 1,
            multi_file_platform: MULTI_FILE_PLATFORM.into(),
            keep_archives: false,
        }
    }
}

/// Progress of one file, tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    pub platform: String,
    pub file_name: String,
    pub progress: UploadProgress,
}

/// Events emitted while publishing.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    /// Archive progress of a platform folder.
    Packaging {
        platform: String,
        entries_processed: u64,
        entries_total: u64,
    },
    Upload(UploadEvent),
    PlatformCompleted {
        platform: String,
        external_url: String,
    },
    PlatformFailed {
        platform: String,
        error: String,
    },
}
