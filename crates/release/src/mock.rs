//! In-memory backends for tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use hyperplay_api::ApiError;
use hyperplay_protocol::messages::{
    Channel, CompleteRequest, CompleteResponse, PartUrl, PresignRequest, PresignedUpload,
    ReviewRequest,
};
use hyperplay_transfer::PartReader;
use tokio::io::AsyncReadExt;

use crate::backend::{BackendFuture, ReleaseApi, UploadBackend};
use crate::collector::mime_type;
use crate::types::UploadUnit;

const STORE_URL: &str = "https://store.test";

/// Records every call and answers from a script.
///
/// Files registered with [`with_descriptor`](Self::with_descriptor) get
/// that many part URLs; other requested files get `auto_parts` URLs, or
/// no descriptor at all when unset.
#[derive(Default)]
pub(crate) struct MockBackend {
    descriptors: BTreeMap<String, usize>,
    auto_parts: Option<usize>,
    failing_part: Option<u32>,
    failing_platform: Option<String>,
    location_override: Option<String>,
    presigns: Mutex<Vec<PresignRequest>>,
    parts: Mutex<Vec<(String, Vec<u8>)>>,
    completions: Mutex<Vec<CompleteRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto(parts: usize) -> Self {
        Self {
            auto_parts: Some(parts),
            ..Self::default()
        }
    }

    pub fn with_descriptor(mut self, file_name: &str, parts: usize) -> Self {
        self.descriptors.insert(file_name.into(), parts);
        self
    }

    /// Part `n` of every file is refused by the store.
    pub fn failing_part(mut self, n: u32) -> Self {
        self.failing_part = Some(n);
        self
    }

    /// Presign requests for `platform` are rejected.
    pub fn failing_platform(mut self, platform: &str) -> Self {
        self.failing_platform = Some(platform.into());
        self
    }

    /// Completion answers with `location` instead of the object path.
    pub fn completing_at(mut self, location: &str) -> Self {
        self.location_override = Some(location.into());
        self
    }

    pub fn presigns(&self) -> Vec<PresignRequest> {
        self.presigns.lock().unwrap().clone()
    }

    pub fn stored_parts(&self) -> Vec<Vec<u8>> {
        self.parts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn completions(&self) -> Vec<CompleteRequest> {
        self.completions.lock().unwrap().clone()
    }

    fn descriptor(request: &PresignRequest, file_name: &str, parts: usize) -> PresignedUpload {
        let key = format!(
            "{}/{}/{}/{}",
            request.account, request.project, request.release, file_name
        );
        PresignedUpload {
            file_name: file_name.into(),
            upload_id: format!("upload-{file_name}"),
            part_urls: (1..=parts as u32)
                .map(|n| PartUrl {
                    part_number: n,
                    url: format!("{STORE_URL}/{key}/part/{n}"),
                })
                .collect(),
            key,
        }
    }
}

fn rejected(context: &str, status: u16) -> ApiError {
    ApiError::Rejected {
        context: context.into(),
        status,
        message: "mock rejection".into(),
    }
}

impl UploadBackend for MockBackend {
    fn presign<'a>(
        &'a self,
        request: &'a PresignRequest,
    ) -> BackendFuture<'a, Vec<PresignedUpload>> {
        Box::pin(async move {
            self.presigns.lock().unwrap().push(request.clone());
            if self.failing_platform.as_deref() == Some(request.platform.as_str()) {
                return Err(rejected("requesting upload URLs", 422));
            }

            let mut out: Vec<PresignedUpload> = self
                .descriptors
                .iter()
                .map(|(name, parts)| Self::descriptor(request, name, *parts))
                .collect();
            if let Some(parts) = self.auto_parts {
                for file in &request.files {
                    if !self.descriptors.contains_key(&file.file_name) {
                        out.push(Self::descriptor(request, &file.file_name, parts));
                    }
                }
            }
            Ok(out)
        })
    }

    fn upload_part<'a>(
        &'a self,
        url: &'a str,
        mut part: PartReader,
        len: u64,
    ) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let mut data = Vec::new();
            part.read_to_end(&mut data).await.unwrap();
            assert_eq!(data.len() as u64, len, "part length mismatch for {url}");

            let number: u32 = url
                .rsplit('/')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or_default();
            if self.failing_part == Some(number) {
                return Err(rejected("uploading part", 403));
            }
            self.parts.lock().unwrap().push((url.to_string(), data));
            Ok(format!("\"etag-{number}\""))
        })
    }

    fn complete<'a>(&'a self, request: &'a CompleteRequest) -> BackendFuture<'a, CompleteResponse> {
        Box::pin(async move {
            self.completions.lock().unwrap().push(request.clone());
            let location = self
                .location_override
                .clone()
                .unwrap_or_else(|| format!("/{}", request.key));
            Ok(CompleteResponse { location })
        })
    }
}

/// Channel listing and review recorder.
#[derive(Default)]
pub(crate) struct MockApi {
    channels: Vec<Channel>,
    reviews: Mutex<Vec<ReviewRequest>>,
    channel_lookups: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn with_channels(names: &[(u64, &str)]) -> Self {
        Self {
            channels: names
                .iter()
                .map(|(id, name)| Channel {
                    channel_id: *id,
                    channel_name: (*name).into(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn reviews(&self) -> Vec<ReviewRequest> {
        self.reviews.lock().unwrap().clone()
    }

    pub fn channel_lookups(&self) -> Vec<String> {
        self.channel_lookups.lock().unwrap().clone()
    }
}

impl ReleaseApi for MockApi {
    fn channels<'a>(&'a self, project_id: &'a str) -> BackendFuture<'a, Vec<Channel>> {
        Box::pin(async move {
            self.channel_lookups.lock().unwrap().push(project_id.into());
            Ok(self.channels.clone())
        })
    }

    fn submit_review<'a>(&'a self, review: &'a ReviewRequest) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.reviews.lock().unwrap().push(review.clone());
            Ok(())
        })
    }
}

/// Builds a unit for an existing file.
pub(crate) fn unit_for(file_name: &str, path: &Path) -> UploadUnit {
    UploadUnit {
        file_name: file_name.into(),
        path: path.to_path_buf(),
        size: std::fs::metadata(path).unwrap().len(),
        mime_type: mime_type(path),
    }
}
