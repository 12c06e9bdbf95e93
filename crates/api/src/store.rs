//! Object store client for presigned part URLs.

use reqwest::Body;
use reqwest::header::{CONTENT_LENGTH, ETAG};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::trace;

use crate::error::{ApiError, StatusMessage, send};

const PART_ERRORS: &[(u16, StatusMessage)] = &[(403, url_expired), (404, upload_not_found)];

fn url_expired(_: &str) -> String {
    "the presigned part URL was refused, it may have expired; publish again to get fresh URLs"
        .into()
}

fn upload_not_found(_: &str) -> String {
    "the multipart upload no longer exists in the object store".into()
}

/// Streams part bodies to presigned URLs.
///
/// Presigned URLs carry their own authorization, so no session cookies
/// are attached.
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    http: reqwest::Client,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// PUTs one part of `len` bytes read from `part` and returns the
    /// ETag the store assigned to it.
    ///
    /// The body is streamed; only one read buffer of the part is held in
    /// memory. The ETag is returned verbatim, quotes included, since
    /// completion must echo it back unchanged.
    pub async fn upload_part<R>(&self, url: &str, part: R, len: u64) -> Result<String, ApiError>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        let context = "uploading part";
        let request = self
            .http
            .put(url)
            .header(CONTENT_LENGTH, len)
            .body(Body::wrap_stream(ReaderStream::new(part)));
        let resp = send(request, context, PART_ERRORS).await?;

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::MissingEtag {
                context: context.into(),
            })?;

        trace!(bytes = len, etag = %etag, "part stored");
        Ok(etag)
    }
}
