use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::METADATA_VERSION;

/// Release metadata document handed to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseMeta {
    #[serde(rename = "_metadata_version")]
    pub metadata_version: String,
    /// Canonical `account/project/release` path.
    pub path: String,
    pub name: String,
    pub description: String,
    pub external_url: String,
    pub platforms: BTreeMap<String, PlatformArtifact>,
}

impl ReleaseMeta {
    /// Creates an empty document for a release; platforms are added as they upload.
    pub fn new(account: &str, project: &str, release: &str, description: &str) -> Self {
        Self {
            metadata_version: METADATA_VERSION.to_string(),
            path: release_path(account, project, release),
            name: release.to_string(),
            description: description.to_string(),
            external_url: String::new(),
            platforms: BTreeMap::new(),
        }
    }
}

/// Returns the canonical `account/project/release` path.
pub fn release_path(account: &str, project: &str, release: &str) -> String {
    format!("{account}/{project}/{release}")
}

/// Uploaded artifact of one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformArtifact {
    pub name: String,
    #[serde(rename = "external_url")]
    pub external_url: String,
    /// Decimal byte count.
    pub download_size: String,
    /// Decimal byte count.
    pub install_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
}
