//! Publisher settings and release manifests.
//!
//! Settings are stored as TOML:
//! - Linux: `~/.config/hyperplay-publish/settings.toml`
//! - Windows: `%APPDATA%/hyperplay-publish/settings.toml`
//!
//! The release manifest is a separate TOML file passed on the command line.

use std::path::{Path, PathBuf};

use anyhow::Context;
use hyperplay_protocol::constants::{DEFAULT_CHAIN_ID, MULTI_FILE_PLATFORM};
use hyperplay_release::{PublishOptions, ReleaseConfig};
use serde::{Deserialize, Serialize};

/// Publisher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Publishing API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Gateway serving uploaded objects.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Directory for archives and the release metadata output.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Parts of one file uploaded at once.
    #[serde(default = "default_part_concurrency")]
    pub part_concurrency: usize,

    /// Platforms processed at once.
    #[serde(default = "default_platform_concurrency")]
    pub platform_concurrency: usize,

    /// Keep archives after a successful upload.
    #[serde(default)]
    pub keep_archives: bool,

    /// Address the signer signs for.
    #[serde(default)]
    pub signer_address: String,

    /// Command (program and arguments) that signs a message read on stdin.
    #[serde(default)]
    pub signer_command: Vec<String>,
}

fn default_api_base_url() -> String {
    "https://developers.hyperplay.xyz".into()
}

fn default_gateway_url() -> String {
    "https://gateway-b3.valist.io".into()
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("hyperplay-publish")
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_part_concurrency() -> usize {
    4
}

fn default_platform_concurrency() -> usize {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            gateway_url: default_gateway_url(),
            work_dir: default_work_dir(),
            chain_id: default_chain_id(),
            part_concurrency: default_part_concurrency(),
            platform_concurrency: default_platform_concurrency(),
            keep_archives: false,
            signer_address: String::new(),
            signer_command: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads settings from disk, writing defaults on first run.
    pub fn load() -> anyhow::Result<Self> {
        let path = settings_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let settings = Settings::default();
            settings.save_to(&path)?;
            tracing::info!(path = %path.display(), "default settings written");
            Ok(settings)
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            work_dir: self.work_dir.clone(),
            gateway_url: self.gateway_url.clone(),
            part_concurrency: self.part_concurrency,
            platform_concurrency: self.platform_concurrency,
            multi_file_platform: MULTI_FILE_PLATFORM.into(),
            keep_archives: self.keep_archives,
        }
    }
}

/// Loads a release manifest. Relative platform paths are resolved
/// against the manifest's directory.
pub fn load_manifest(path: &Path) -> anyhow::Result<ReleaseConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let mut config: ReleaseConfig = toml::from_str(&content)
        .with_context(|| format!("parsing manifest {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for spec in config.platforms.values_mut() {
        if spec.path.is_relative() {
            spec.path = base.join(&spec.path);
        }
    }
    config.validate()?;
    Ok(config)
}

/// Returns the platform-specific settings file path.
fn settings_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("hyperplay-publish")
            .join("settings.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata)
            .join("hyperplay-publish")
            .join("settings.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/hyperplay-publish/settings.toml"))
    }
}
