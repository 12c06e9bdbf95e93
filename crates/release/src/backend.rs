//! Remote collaborators of the publish flow.
//!
//! [`UploadBackend`] and [`ReleaseApi`] keep the pipeline decoupled from
//! HTTP so it can be driven by in-memory mocks. [`SessionBackend`] is
//! the real implementation over an authenticated session.

use std::future::Future;
use std::pin::Pin;

use hyperplay_api::{ApiError, AuthSession, ObjectStore, endpoints};
use hyperplay_protocol::messages::{
    Channel, CompleteRequest, CompleteResponse, PresignRequest, PresignedUpload, ReviewRequest,
};
use hyperplay_transfer::PartReader;

/// Future returned by backend calls.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Presign, part upload and completion.
pub trait UploadBackend: Send + Sync {
    /// Negotiates part URLs for every file of one platform in one call.
    fn presign<'a>(&'a self, request: &'a PresignRequest)
    -> BackendFuture<'a, Vec<PresignedUpload>>;

    /// Streams one part of `len` bytes and returns its ETag.
    fn upload_part<'a>(&'a self, url: &'a str, part: PartReader, len: u64)
    -> BackendFuture<'a, String>;

    fn complete<'a>(&'a self, request: &'a CompleteRequest) -> BackendFuture<'a, CompleteResponse>;
}

/// Channel lookup and review submission.
pub trait ReleaseApi: Send + Sync {
    fn channels<'a>(&'a self, project_id: &'a str) -> BackendFuture<'a, Vec<Channel>>;

    fn submit_review<'a>(&'a self, review: &'a ReviewRequest) -> BackendFuture<'a, ()>;
}

/// Backend over an authenticated API session and the object store.
#[derive(Debug, Clone)]
pub struct SessionBackend {
    session: AuthSession,
    store: ObjectStore,
}

impl SessionBackend {
    pub fn new(session: AuthSession) -> Self {
        Self {
            session,
            store: ObjectStore::new(),
        }
    }
}

impl UploadBackend for SessionBackend {
    fn presign<'a>(
        &'a self,
        request: &'a PresignRequest,
    ) -> BackendFuture<'a, Vec<PresignedUpload>> {
        Box::pin(endpoints::request_presigned_urls(&self.session, request))
    }

    fn upload_part<'a>(
        &'a self,
        url: &'a str,
        part: PartReader,
        len: u64,
    ) -> BackendFuture<'a, String> {
        Box::pin(self.store.upload_part(url, part, len))
    }

    fn complete<'a>(&'a self, request: &'a CompleteRequest) -> BackendFuture<'a, CompleteResponse> {
        Box::pin(endpoints::complete_multipart_upload(&self.session, request))
    }
}

impl ReleaseApi for SessionBackend {
    fn channels<'a>(&'a self, project_id: &'a str) -> BackendFuture<'a, Vec<Channel>> {
        Box::pin(endpoints::list_channels(&self.session, project_id))
    }

    fn submit_review<'a>(&'a self, review: &'a ReviewRequest) -> BackendFuture<'a, ()> {
        Box::pin(endpoints::submit_review(&self.session, review))
    }
}
