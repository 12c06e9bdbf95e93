//! Multipart upload of one platform's units.

use std::collections::BTreeMap;

use futures_util::StreamExt;
use hyperplay_protocol::messages::{
    CompleteRequest, CompletedPart, PresignFile, PresignRequest, PresignedUpload,
};
use hyperplay_transfer::{PartProgress, SpeedCalculator, UploadProgress, open_part, plan_parts};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::UploadBackend;
use crate::error::PublishError;
use crate::types::{PublishEvent, ReleaseId, UploadEvent, UploadUnit};

/// Uploads the units of one platform through a backend.
pub struct MultipartUploader<'a> {
    backend: &'a dyn UploadBackend,
    cancel: CancellationToken,
    part_concurrency: usize,
}

impl<'a> MultipartUploader<'a> {
    pub fn new(
        backend: &'a dyn UploadBackend,
        cancel: CancellationToken,
        part_concurrency: usize,
    ) -> Self {
        Self {
            backend,
            cancel,
            part_concurrency: part_concurrency.max(1),
        }
    }

    /// Negotiates URLs for all `units` in one call, then uploads them one
    /// file at a time. Returns the location of every file by name.
    ///
    /// Any failure aborts the platform; files already completed stay in
    /// the store but nothing is reported for them.
    pub async fn negotiate_and_upload(
        &self,
        release: &ReleaseId,
        platform: &str,
        units: &[UploadUnit],
        events: &mpsc::UnboundedSender<PublishEvent>,
    ) -> Result<BTreeMap<String, String>, PublishError> {
        self.check_cancelled()?;

        let files = units
            .iter()
            .map(|u| PresignFile {
                file_name: u.file_name.clone(),
                file_type: u.mime_type.clone(),
                file_size: u.size,
            })
            .collect();
        let request = PresignRequest::release(
            &release.account,
            &release.project,
            &release.release,
            platform,
            files,
        );
        let mut descriptors = self.backend.presign(&request).await?;
        debug!(platform, files = units.len(), descriptors = descriptors.len(), "presigned");

        let mut locations = BTreeMap::new();
        for unit in units {
            let idx = descriptors
                .iter()
                .position(|d| d.file_name == unit.file_name)
                .ok_or_else(|| PublishError::MissingDescriptor {
                    platform: platform.to_string(),
                    file: unit.file_name.clone(),
                })?;
            let descriptor = descriptors.swap_remove(idx);
            let location = self.upload_unit(platform, unit, descriptor, events).await?;
            locations.insert(unit.file_name.clone(), location);
        }

        Ok(locations)
    }

    async fn upload_unit(
        &self,
        platform: &str,
        unit: &UploadUnit,
        descriptor: PresignedUpload,
        events: &mpsc::UnboundedSender<PublishEvent>,
    ) -> Result<String, PublishError> {
        self.check_cancelled()?;

        let mut part_urls = descriptor.part_urls;
        if part_urls.is_empty() {
            return Err(PublishError::NoPartUrls {
                platform: platform.to_string(),
                file: unit.file_name.clone(),
            });
        }
        part_urls.sort_by_key(|p| p.part_number);

        let ranges = plan_parts(unit.size, part_urls.len());
        let total_parts = part_urls.len();
        debug!(platform, file = %unit.file_name, bytes = unit.size, parts = total_parts, "uploading");

        let uploads = part_urls.iter().zip(ranges.iter()).map(|(part, range)| async move {
            let len = range.len;
            let reader = open_part(&unit.path, range).await?;
            let etag = self
                .backend
                .upload_part(&part.url, reader, len)
                .await
                .map_err(|source| PublishError::PartUpload {
                    platform: platform.to_string(),
                    file: unit.file_name.clone(),
                    part: part.part_number,
                    source,
                })?;
            debug!(platform, file = %unit.file_name, part = part.part_number, bytes = len, "part uploaded");
            Ok::<_, PublishError>((
                CompletedPart {
                    part_number: part.part_number,
                    etag,
                },
                len,
            ))
        });
        let mut in_flight = futures_util::stream::iter(uploads).buffer_unordered(self.part_concurrency);

        let mut progress = PartProgress::new(unit.size, total_parts);
        let mut speed = SpeedCalculator::new();
        let mut completed = Vec::with_capacity(total_parts);
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PublishError::Cancelled),
                next = in_flight.next() => next,
            };
            // Returning drops the stream and with it every sibling part.
            let Some(result) = next else { break };
            let (part, bytes) = result?;
            completed.push(part);
            speed.add(bytes);

            let percent = progress.record(bytes);
            emit(events, platform, &unit.file_name, UploadProgress::Progress(percent));
        }
        drop(in_flight);

        completed.sort_by_key(|p| p.part_number);
        let request = CompleteRequest {
            upload_id: descriptor.upload_id,
            key: descriptor.key,
            parts: completed,
        };
        self.check_cancelled()?;
        let location = self.backend.complete(&request).await?.location;
        if location.trim().is_empty() {
            return Err(PublishError::MissingLocation {
                platform: platform.to_string(),
                file: unit.file_name.clone(),
            });
        }

        info!(
            platform,
            file = %unit.file_name,
            parts = total_parts,
            bytes_per_sec = speed.bytes_per_second() as u64,
            %location,
            "file uploaded"
        );
        emit(
            events,
            platform,
            &unit.file_name,
            UploadProgress::Completed(location.clone()),
        );
        Ok(location)
    }

    fn check_cancelled(&self) -> Result<(), PublishError> {
        if self.cancel.is_cancelled() {
            Err(PublishError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn emit(
    events: &mpsc::UnboundedSender<PublishEvent>,
    platform: &str,
    file_name: &str,
    progress: UploadProgress,
) {
    let _ = events.send(PublishEvent::Upload(UploadEvent {
        platform: platform.to_string(),
        file_name: file_name.to_string(),
        progress,
    }));
}
