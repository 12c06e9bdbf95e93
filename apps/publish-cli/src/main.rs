//! HyperPlay release publisher entry point.
//!
//! Usage: `hyperplay-publish <release.toml>`

mod config;
mod progress;
mod signer;

use std::path::{Path, PathBuf};

use anyhow::Context;
use hyperplay_api::AuthOptions;
use hyperplay_protocol::ReleaseMeta;
use hyperplay_release::{ReleaseConfig, ReleasePublisher, SessionBackend};
use tracing_subscriber::EnvFilter;

use config::{Settings, load_manifest};
use progress::spawn_logger;
use signer::CommandSigner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting HyperPlay publisher"
    );

    let manifest_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: hyperplay-publish <release.toml>")?;

    let settings = Settings::load()?;
    let release = load_manifest(&manifest_path)?;
    tracing::info!(
        release = %release.id().path(),
        platforms = release.platforms.len(),
        "manifest loaded"
    );

    let signer = CommandSigner::new(&settings.signer_address, &settings.signer_command)?;
    let options = AuthOptions {
        chain_id: settings.chain_id,
        ..AuthOptions::default()
    };
    let session = hyperplay_api::authenticate_with(&settings.api_base_url, &signer, &options)
        .await
        .context("sign-in failed")?;
    let backend = SessionBackend::new(session);

    let mut publisher = ReleasePublisher::new(settings.publish_options());
    let log_task = publisher.take_events().map(spawn_logger);

    let cancel = publisher.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling uploads");
            cancel.cancel();
        }
    });

    let outcome = run(&publisher, &settings, &release, &backend).await;

    // Closing the event channel lets the logger drain and finish.
    drop(publisher);
    if let Some(task) = log_task
        && let Ok(lines) = task.await
    {
        tracing::debug!(lines, "event log finished");
    }
    outcome
}

async fn run(
    publisher: &ReleasePublisher,
    settings: &Settings,
    release: &ReleaseConfig,
    backend: &SessionBackend,
) -> anyhow::Result<()> {
    let meta = match publisher.publish(release, backend).await {
        Ok(meta) => meta,
        Err(e) if e.is_cancelled() => {
            tracing::warn!("publish cancelled; no release metadata written");
            return Err(e.into());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("publish failed")),
    };
    let meta_path = write_meta(&settings.work_dir, &meta)?;
    tracing::info!(path = %meta_path.display(), "release metadata written");

    match (&release.channel, &release.project_id) {
        (Some(channel), Some(project_id)) => {
            publisher
                .submit(backend, project_id, &meta.path, channel)
                .await
                .context("review submission failed")?;
        }
        (Some(_), None) => {
            tracing::warn!("`channel` is set without `projectId`; review not submitted");
        }
        _ => {}
    }

    Ok(())
}

/// Writes the metadata for the ledger client as `<release>.meta.json`.
fn write_meta(work_dir: &Path, meta: &ReleaseMeta) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(work_dir)?;
    let path = work_dir.join(format!("{}.meta.json", meta.name));
    let json = serde_json::to_string_pretty(meta)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
