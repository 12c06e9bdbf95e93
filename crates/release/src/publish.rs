//! Release publish orchestrator.
//!
//! Runs every configured platform through package → collect → upload,
//! assembles the [`ReleaseMeta`] and submits the release for review on
//! a channel. Platforms are independent: one failing never stops the
//! others, but the release is only produced when all of them succeed.

use std::path::Path;

use futures_util::StreamExt;
use hyperplay_protocol::messages::{Channel, ReviewRequest};
use hyperplay_protocol::{PlatformArtifact, ReleaseMeta};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::backend::{ReleaseApi, UploadBackend};
use crate::collector::collect_units;
use crate::error::{PlatformFailure, PublishError};
use crate::packaging::{discard_archive, prepare_entry};
use crate::types::{
    PlatformEntry, PlatformSpec, PublishEvent, PublishOptions, ReleaseConfig, ReleaseId,
};
use crate::uploader::MultipartUploader;

/// Entry point of a multi-file bundle, used as its public URL.
const BUNDLE_ENTRY_POINT: &str = "index.html";

/// Publishes releases and submits them for review.
pub struct ReleasePublisher {
    options: PublishOptions,
    events_tx: mpsc::UnboundedSender<PublishEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<PublishEvent>>,
    cancel: CancellationToken,
}

impl Default for ReleasePublisher {
    fn default() -> Self {
        Self::new(PublishOptions::default())
    }
}

impl ReleasePublisher {
    pub fn new(options: PublishOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            options,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<PublishEvent>> {
        self.events_rx.take()
    }

    /// Cancelling aborts in-flight uploads; nothing is completed afterwards.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads every platform of `config` and returns the release metadata.
    ///
    /// Returns [`PublishError::PlatformsFailed`] when any platform failed,
    /// after the remaining platforms have run to completion.
    pub async fn publish(
        &self,
        config: &ReleaseConfig,
        backend: &dyn UploadBackend,
    ) -> Result<ReleaseMeta, PublishError> {
        config.validate()?;
        let id = config.id();
        info!(
            path = %id.path(),
            platforms = config.platforms.len(),
            "publishing release"
        );

        let results: Vec<(String, Result<PlatformArtifact, PublishError>)> =
            futures_util::stream::iter(&config.platforms)
                .map(|(key, spec)| {
                    let id = &id;
                    async move { (key.clone(), self.publish_platform(id, key, spec, backend).await) }
                })
                .buffer_unordered(self.options.platform_concurrency.max(1))
                .collect()
                .await;

        if self.cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let mut meta = ReleaseMeta::new(&id.account, &id.project, &id.release, &config.description);
        let mut failures = Vec::new();
        for (platform, result) in results {
            match result {
                Ok(artifact) => {
                    meta.platforms.insert(platform, artifact);
                }
                Err(e) => failures.push(PlatformFailure {
                    platform,
                    error: e.to_string(),
                }),
            }
        }
        if !failures.is_empty() {
            failures.sort_by(|a, b| a.platform.cmp(&b.platform));
            return Err(PublishError::PlatformsFailed(failures));
        }

        info!(path = %meta.path, platforms = meta.platforms.len(), "release uploaded");
        Ok(meta)
    }

    /// Resolves `channel_name` among the project's channels and submits
    /// the release for review on it.
    ///
    /// An unknown channel fails without calling the submission endpoint.
    pub async fn submit(
        &self,
        api: &dyn ReleaseApi,
        project_id: &str,
        release_path: &str,
        channel_name: &str,
    ) -> Result<Channel, PublishError> {
        let channels = api.channels(project_id).await?;
        let Some(channel) = channels
            .iter()
            .find(|c| c.channel_name == channel_name)
            .cloned()
        else {
            return Err(PublishError::UnknownChannel {
                requested: channel_name.to_string(),
                available: channels.into_iter().map(|c| c.channel_name).collect(),
            });
        };

        let review = ReviewRequest {
            path: release_path.to_string(),
            channel_id: channel.channel_id,
        };
        api.submit_review(&review).await?;

        info!(path = release_path, channel = %channel.channel_name, "release submitted for review");
        Ok(channel)
    }

    async fn publish_platform(
        &self,
        id: &ReleaseId,
        platform: &str,
        spec: &PlatformSpec,
        backend: &dyn UploadBackend,
    ) -> Result<PlatformArtifact, PublishError> {
        let result = self.run_platform(id, platform, spec, backend).await;
        let event = match &result {
            Ok(artifact) => {
                info!(platform, url = %artifact.external_url, size = %artifact.download_size, "platform uploaded");
                PublishEvent::PlatformCompleted {
                    platform: platform.to_string(),
                    external_url: artifact.external_url.clone(),
                }
            }
            Err(e) => {
                error!(platform, error = %e, "platform failed");
                PublishEvent::PlatformFailed {
                    platform: platform.to_string(),
                    error: e.to_string(),
                }
            }
        };
        let _ = self.events_tx.send(event);
        result
    }

    async fn run_platform(
        &self,
        id: &ReleaseId,
        platform: &str,
        spec: &PlatformSpec,
        backend: &dyn UploadBackend,
    ) -> Result<PlatformArtifact, PublishError> {
        if self.cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let entry = prepare_entry(platform, spec, &self.options.work_dir, &self.events_tx).await?;
        let artifact = self.upload_entry(id, &entry, backend).await?;
        if !self.options.keep_archives {
            discard_archive(&entry).await;
        }
        Ok(artifact)
    }

    async fn upload_entry(
        &self,
        id: &ReleaseId,
        entry: &PlatformEntry,
        backend: &dyn UploadBackend,
    ) -> Result<PlatformArtifact, PublishError> {
        let units = collect_units(&entry.platform, &entry.path, &self.options.multi_file_platform)?;
        if units.is_empty() {
            return Err(PublishError::InvalidConfig(format!(
                "platform {} has no files to upload",
                entry.platform
            )));
        }

        let uploader =
            MultipartUploader::new(backend, self.cancel.clone(), self.options.part_concurrency);
        let locations = uploader
            .negotiate_and_upload(id, &entry.platform, &units, &self.events_tx)
            .await?;

        let bundle = entry.path.is_dir();
        let primary = if bundle {
            units
                .iter()
                .find(|u| u.file_name == BUNDLE_ENTRY_POINT)
                .unwrap_or(&units[0])
        } else {
            &units[0]
        };
        let location = locations
            .get(&primary.file_name)
            .ok_or_else(|| PublishError::MissingDescriptor {
                platform: entry.platform.clone(),
                file: primary.file_name.clone(),
            })?;

        let name = if bundle {
            dir_name(&entry.path)
        } else {
            primary.file_name.clone()
        };
        let size = units.iter().map(|u| u.size).sum::<u64>().to_string();

        Ok(PlatformArtifact {
            name,
            external_url: resolve_location(&self.options.gateway_url, location),
            download_size: size.clone(),
            install_size: size,
            install_script: entry.install_script.clone(),
            executable: entry.executable.clone(),
        })
    }
}

/// Turns a completion location into a public URL.
///
/// Absolute URLs are kept; paths are served from the gateway.
pub fn resolve_location(gateway_url: &str, location: &str) -> String {
    if location.starts_with("https://") || location.starts_with("http://") {
        return location.to_string();
    }
    let gateway = gateway_url.trim_end_matches('/');
    if location.starts_with('/') {
        format!("{gateway}{location}")
    } else {
        format!("{gateway}/{location}")
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockApi, MockBackend};
    use hyperplay_transfer::UploadProgress;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const GATEWAY: &str = "https://gateway-b3.valist.io";

    fn options(work_dir: &Path) -> PublishOptions {
        PublishOptions {
            work_dir: work_dir.to_path_buf(),
            gateway_url: GATEWAY.into(),
            part_concurrency: 2,
            platform_concurrency: 1,
            ..PublishOptions::default()
        }
    }

    fn spec(path: PathBuf, zip: bool) -> PlatformSpec {
        PlatformSpec {
            path,
            install_script: None,
            executable: None,
            zip,
        }
    }

    fn config(platforms: Vec<(&str, PlatformSpec)>) -> ReleaseConfig {
        ReleaseConfig {
            account: "acme".into(),
            project: "game".into(),
            release: "v1.0.0".into(),
            description: "first release".into(),
            platforms: platforms
                .into_iter()
                .map(|(k, s)| (k.to_string(), s))
                .collect::<BTreeMap<_, _>>(),
            channel: None,
            project_id: None,
        }
    }

    fn windows_build(root: &Path) -> PathBuf {
        let build = root.join("win");
        fs::create_dir_all(build.join("data")).unwrap();
        fs::write(build.join("game.exe"), vec![b'M'; 8192]).unwrap();
        fs::write(build.join("data").join("level1.dat"), b"LEVEL").unwrap();
        build
    }

    fn web_build(root: &Path) -> PathBuf {
        let build = root.join("web-bundle");
        fs::create_dir_all(build.join("js")).unwrap();
        fs::write(build.join("index.html"), b"<html>").unwrap();
        fs::write(build.join("js").join("app.js"), b"main()").unwrap();
        build
    }

    #[tokio::test]
    async fn windows_release_scenario() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let mut win = spec(windows_build(src.path()), true);
        win.executable = Some("game.exe".into());

        let backend = MockBackend::auto(1);
        let publisher = ReleasePublisher::new(PublishOptions {
            keep_archives: true,
            ..options(work.path())
        });
        let meta = publisher
            .publish(&config(vec![("windows_amd64", win)]), &backend)
            .await
            .unwrap();

        assert_eq!(meta.metadata_version, "2");
        assert_eq!(meta.path, "acme/game/v1.0.0");
        assert_eq!(meta.name, "v1.0.0");
        assert_eq!(meta.description, "first release");
        assert_eq!(meta.platforms.len(), 1);

        let artifact = &meta.platforms["windows_amd64"];
        assert_eq!(artifact.name, "windows_amd64.zip");
        assert_eq!(
            artifact.external_url,
            "https://gateway-b3.valist.io/acme/game/v1.0.0/windows_amd64.zip"
        );
        assert_eq!(artifact.executable.as_deref(), Some("game.exe"));

        let archive = work.path().join("windows_amd64.zip");
        let archive_size = fs::metadata(&archive).unwrap().len();
        assert_eq!(artifact.download_size, archive_size.to_string());
        assert_eq!(artifact.install_size, artifact.download_size);

        let presign = &backend.presigns()[0];
        assert_eq!(presign.account, "acme");
        assert_eq!(presign.upload_type, "release");
        assert_eq!(presign.files[0].file_name, "windows_amd64.zip");
        assert_eq!(presign.files[0].file_type, "application/zip");
        assert_eq!(presign.files[0].file_size, archive_size);

        assert_eq!(backend.stored_parts().len(), 1);
        assert_eq!(backend.stored_parts()[0].len() as u64, archive_size);
        let completions = backend.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].parts.len(), 1);
        assert_eq!(completions[0].parts[0].part_number, 1);
    }

    #[tokio::test]
    async fn absolute_location_becomes_external_url() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let location = "https://cdn.example.test/acme/game/v1.0.0/windows_amd64.zip";

        let backend = MockBackend::auto(1).completing_at(location);
        let meta = ReleasePublisher::new(options(work.path()))
            .publish(
                &config(vec![("windows_amd64", spec(windows_build(src.path()), true))]),
                &backend,
            )
            .await
            .unwrap();
        assert_eq!(meta.platforms["windows_amd64"].external_url, location);
    }

    #[tokio::test]
    async fn blank_location_leaves_no_entry() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let linux = src.path().join("game.AppImage");
        fs::write(&linux, b"ELF").unwrap();

        let backend = MockBackend::auto(1).completing_at("");
        let mut publisher = ReleasePublisher::new(options(work.path()));
        let mut events = publisher.take_events().unwrap();
        let err = publisher
            .publish(&config(vec![("linux_amd64", spec(linux, false))]), &backend)
            .await
            .unwrap_err();

        match &err {
            PublishError::PlatformsFailed(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].platform, "linux_amd64");
                assert!(failures[0].error.contains("no location returned"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        drop(publisher);
        while let Some(e) = events.recv().await {
            assert!(
                !matches!(e, PublishEvent::PlatformCompleted { .. }),
                "unexpected {e:?}"
            );
        }
    }

    #[tokio::test]
    async fn platform_key_cannot_escape_work_dir() {
        let src = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let work = root.path().join("work");

        let backend = MockBackend::auto(1);
        let err = ReleasePublisher::new(options(&work))
            .publish(
                &config(vec![("../escaped", spec(windows_build(src.path()), true))]),
                &backend,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::InvalidConfig(_)), "{err:?}");
        assert!(!root.path().join("escaped.zip").exists());
        assert!(backend.presigns().is_empty());
    }

    #[tokio::test]
    async fn one_entry_per_configured_platform() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let linux = src.path().join("game.AppImage");
        fs::write(&linux, vec![1u8; 500]).unwrap();

        let cfg = config(vec![
            ("windows_amd64", spec(windows_build(src.path()), true)),
            ("linux_amd64", spec(linux, false)),
            ("web", spec(web_build(src.path()), false)),
        ]);
        let backend = MockBackend::auto(2);
        let meta = ReleasePublisher::new(options(work.path()))
            .publish(&cfg, &backend)
            .await
            .unwrap();

        let keys: Vec<&str> = meta.platforms.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["linux_amd64", "web", "windows_amd64"]);
        assert_eq!(meta.platforms["linux_amd64"].name, "game.AppImage");
        assert_eq!(meta.platforms["linux_amd64"].download_size, "500");
    }

    #[tokio::test]
    async fn web_bundle_points_at_entry_point() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let cfg = config(vec![("web", spec(web_build(src.path()), false))]);

        let backend = MockBackend::auto(1);
        let meta = ReleasePublisher::new(options(work.path()))
            .publish(&cfg, &backend)
            .await
            .unwrap();

        let web = &meta.platforms["web"];
        assert_eq!(web.name, "web-bundle");
        assert_eq!(
            web.external_url,
            "https://gateway-b3.valist.io/acme/game/v1.0.0/index.html"
        );
        assert_eq!(web.download_size, (6 + 6).to_string());

        let files: Vec<String> = backend.presigns()[0]
            .files
            .iter()
            .map(|f| f.file_name.clone())
            .collect();
        assert_eq!(files, vec!["index.html", "js/app.js"]);
        assert_eq!(backend.completions().len(), 2);
    }

    #[tokio::test]
    async fn failed_platform_does_not_stop_siblings() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let linux = src.path().join("game.AppImage");
        fs::write(&linux, b"ELF").unwrap();
        let mac = src.path().join("game.dmg");
        fs::write(&mac, b"DMG").unwrap();

        let cfg = config(vec![
            ("darwin_amd64", spec(mac, false)),
            ("linux_amd64", spec(linux, false)),
        ]);
        let backend = MockBackend::auto(1).failing_platform("darwin_amd64");
        let mut publisher = ReleasePublisher::new(PublishOptions {
            platform_concurrency: 2,
            ..options(work.path())
        });
        let mut events = publisher.take_events().unwrap();

        let err = publisher.publish(&cfg, &backend).await.unwrap_err();
        match err {
            PublishError::PlatformsFailed(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].platform, "darwin_amd64");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The sibling still uploaded.
        assert_eq!(backend.completions().len(), 1);
        assert!(backend.completions()[0].key.ends_with("game.AppImage"));

        drop(publisher);
        let mut completed = Vec::new();
        let mut failed = Vec::new();
        while let Some(e) = events.recv().await {
            match e {
                PublishEvent::PlatformCompleted { platform, .. } => completed.push(platform),
                PublishEvent::PlatformFailed { platform, .. } => failed.push(platform),
                _ => {}
            }
        }
        assert_eq!(completed, vec!["linux_amd64"]);
        assert_eq!(failed, vec!["darwin_amd64"]);
    }

    #[tokio::test]
    async fn part_failure_leaves_no_entry() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let linux = src.path().join("game.AppImage");
        fs::write(&linux, vec![0u8; 90]).unwrap();

        let backend = MockBackend::auto(3).failing_part(3);
        let err = ReleasePublisher::new(options(work.path()))
            .publish(&config(vec![("linux_amd64", spec(linux, false))]), &backend)
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::PlatformsFailed(_)), "{err:?}");
        assert!(err.to_string().contains("part 3"));
        assert!(backend.completions().is_empty());
    }

    #[tokio::test]
    async fn archive_removed_after_upload() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let cfg = config(vec![("windows_amd64", spec(windows_build(src.path()), true))]);

        ReleasePublisher::new(options(work.path()))
            .publish(&cfg, &MockBackend::auto(1))
            .await
            .unwrap();
        assert!(!work.path().join("windows_amd64.zip").exists());
    }

    #[tokio::test]
    async fn events_tag_their_unit_and_end_with_location() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let linux = src.path().join("game.AppImage");
        fs::write(&linux, vec![9u8; 400]).unwrap();

        let mut publisher = ReleasePublisher::new(options(work.path()));
        let mut events = publisher.take_events().unwrap();
        assert!(publisher.take_events().is_none());

        publisher
            .publish(
                &config(vec![("linux_amd64", spec(linux, false))]),
                &MockBackend::auto(4),
            )
            .await
            .unwrap();
        drop(publisher);

        let mut uploads = Vec::new();
        while let Some(e) = events.recv().await {
            if let PublishEvent::Upload(u) = e {
                assert_eq!(u.platform, "linux_amd64");
                assert_eq!(u.file_name, "game.AppImage");
                uploads.push(u.progress);
            }
        }
        assert_eq!(uploads.len(), 5);
        assert_eq!(
            uploads.last(),
            Some(&UploadProgress::Completed(
                "/acme/game/v1.0.0/game.AppImage".into()
            ))
        );
    }

    #[tokio::test]
    async fn cancelled_publish_uploads_nothing() {
        let src = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let linux = src.path().join("game.AppImage");
        fs::write(&linux, b"ELF").unwrap();

        let publisher = ReleasePublisher::new(options(work.path()));
        publisher.cancel_token().cancel();
        let backend = MockBackend::auto(1);
        let err = publisher
            .publish(&config(vec![("linux_amd64", spec(linux, false))]), &backend)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(backend.presigns().is_empty());
        assert!(backend.completions().is_empty());
    }

    #[tokio::test]
    async fn submit_resolves_channel_by_name() {
        let api = MockApi::with_channels(&[(1, "main"), (2, "beta")]);
        let publisher = ReleasePublisher::default();

        let channel = publisher
            .submit(&api, "42", "acme/game/v1.0.0", "beta")
            .await
            .unwrap();
        assert_eq!(channel.channel_id, 2);
        assert_eq!(api.channel_lookups(), vec!["42"]);

        let reviews = api.reviews();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].path, "acme/game/v1.0.0");
        assert_eq!(reviews[0].channel_id, 2);
    }

    #[tokio::test]
    async fn missing_channel_lists_the_only_one_available() {
        let api = MockApi::with_channels(&[(307, "main")]);
        let err = ReleasePublisher::default()
            .submit(&api, "42", "acme/game/v1.0.0", "beta")
            .await
            .unwrap_err();

        match &err {
            PublishError::UnknownChannel {
                requested,
                available,
            } => {
                assert_eq!(requested, "beta");
                assert_eq!(available, &vec!["main".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().ends_with("available channels: main"));
        assert!(api.reviews().is_empty());
    }

    #[tokio::test]
    async fn channel_match_is_case_sensitive() {
        let api = MockApi::with_channels(&[(1, "main"), (2, "beta")]);
        let err = ReleasePublisher::default()
            .submit(&api, "42", "acme/game/v1.0.0", "Beta")
            .await
            .unwrap_err();

        match &err {
            PublishError::UnknownChannel {
                requested,
                available,
            } => {
                assert_eq!(requested, "Beta");
                assert_eq!(available, &vec!["main".to_string(), "beta".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("main, beta"));
        assert!(api.reviews().is_empty());
    }

    #[test]
    fn locations_resolve_against_gateway() {
        assert_eq!(
            resolve_location(GATEWAY, "/acme/game/v1/a.zip"),
            "https://gateway-b3.valist.io/acme/game/v1/a.zip"
        );
        assert_eq!(
            resolve_location("https://gw.test/", "acme/a.zip"),
            "https://gw.test/acme/a.zip"
        );
        assert_eq!(
            resolve_location(GATEWAY, "https://cdn.test/a.zip"),
            "https://cdn.test/a.zip"
        );
    }
}
