//! Console reporting of publish events.

use std::collections::HashMap;

use hyperplay_release::PublishEvent;
use hyperplay_transfer::UploadProgress;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Percentage step between two logged progress lines of one file.
const LOG_STEP: u8 = 10;

/// Logs publish events, throttling per-file progress to [`LOG_STEP`] increments.
#[derive(Debug, Default)]
pub struct ProgressLog {
    last: HashMap<(String, String), u8>,
}

impl ProgressLog {
    /// Logs `event`; returns whether a line was written.
    pub fn log(&mut self, event: &PublishEvent) -> bool {
        match event {
            PublishEvent::Packaging {
                platform,
                entries_processed,
                entries_total,
            } => {
                if entries_processed == entries_total {
                    tracing::info!(%platform, entries = entries_total, "folder archived");
                    return true;
                }
                false
            }
            PublishEvent::Upload(upload) => match &upload.progress {
                UploadProgress::Progress(percent) => {
                    let key = (upload.platform.clone(), upload.file_name.clone());
                    let last = self.last.get(&key).copied();
                    let due = match last {
                        None => true,
                        Some(prev) => *percent >= prev.saturating_add(LOG_STEP) || *percent == 100,
                    };
                    if due && last != Some(*percent) {
                        tracing::info!(
                            platform = %upload.platform,
                            file = %upload.file_name,
                            percent,
                            "upload progress"
                        );
                        self.last.insert(key, *percent);
                        return true;
                    }
                    false
                }
                UploadProgress::Completed(location) => {
                    tracing::debug!(
                        platform = %upload.platform,
                        file = %upload.file_name,
                        %location,
                        "file stored"
                    );
                    true
                }
            },
            PublishEvent::PlatformCompleted {
                platform,
                external_url,
            } => {
                tracing::info!(%platform, url = %external_url, "platform published");
                true
            }
            PublishEvent::PlatformFailed { platform, error } => {
                tracing::error!(%platform, %error, "platform failed");
                true
            }
        }
    }
}

/// Logs events until every sender is gone; resolves to the number of
/// lines written.
pub fn spawn_logger(mut events: mpsc::UnboundedReceiver<PublishEvent>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut log = ProgressLog::default();
        let mut lines = 0;
        while let Some(event) = events.recv().await {
            if log.log(&event) {
                lines += 1;
            }
        }
        lines
    })
}
