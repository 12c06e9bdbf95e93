//! Authenticated publishing endpoints.
//!
//! Each call takes the [`AuthSession`] explicitly and classifies its
//! failures with its own status table.

use hyperplay_protocol::constants::{CHANNELS_PATH, COMPLETE_PATH, PRESIGN_PATH, REVIEW_PATH};
use hyperplay_protocol::messages::{
    Channel, CompleteRequest, CompleteResponse, PresignRequest, PresignResponse, PresignedUpload,
    ReviewRequest,
};
use reqwest::Method;
use tracing::debug;

use crate::error::{
    ApiError, StatusMessage, access_denied, authentication_expired, decode, send,
    validation_failed,
};
use crate::session::AuthSession;

const CHANNEL_ERRORS: &[(u16, StatusMessage)] = &[
    (401, authentication_expired),
    (403, access_denied),
    (404, project_not_found),
];

const REVIEW_ERRORS: &[(u16, StatusMessage)] = &[
    (401, authentication_expired),
    (403, access_denied),
    (404, review_target_not_found),
    (409, already_in_review),
    (422, validation_failed),
];

const PRESIGN_ERRORS: &[(u16, StatusMessage)] = &[
    (401, authentication_expired),
    (403, access_denied),
    (404, owner_not_found),
    (409, release_exists),
    (422, validation_failed),
];

const COMPLETE_ERRORS: &[(u16, StatusMessage)] = &[
    (401, authentication_expired),
    (403, access_denied),
    (404, upload_not_found),
    (409, parts_mismatch),
    (422, validation_failed),
];

fn project_not_found(_: &str) -> String {
    "project not found, check the project id".into()
}

fn review_target_not_found(_: &str) -> String {
    "release or channel not found".into()
}

fn already_in_review(_: &str) -> String {
    "this release is already submitted for review on the channel".into()
}

fn owner_not_found(_: &str) -> String {
    "account or project not found".into()
}

fn release_exists(_: &str) -> String {
    "a release with this name already exists".into()
}

fn upload_not_found(_: &str) -> String {
    "upload not found, it may have expired or been aborted".into()
}

fn parts_mismatch(detail: &str) -> String {
    format!("the upload could not be assembled, parts did not match ({detail})")
}

/// Lists the release channels of a project.
pub async fn list_channels(
    session: &AuthSession,
    project_id: &str,
) -> Result<Vec<Channel>, ApiError> {
    let context = "listing channels";
    let request = session
        .request(Method::GET, CHANNELS_PATH)?
        .query(&[("project_id", project_id)]);
    let resp = send(request, context, CHANNEL_ERRORS).await?;
    let channels: Vec<Channel> = decode(resp, context).await?;
    debug!(project_id, channels = channels.len(), "channels listed");
    Ok(channels)
}

/// Queues a published release for review on a channel.
pub async fn submit_review(session: &AuthSession, review: &ReviewRequest) -> Result<(), ApiError> {
    let request = session.request(Method::POST, REVIEW_PATH)?.json(review);
    send(request, "submitting review", REVIEW_ERRORS).await?;
    debug!(path = %review.path, channel_id = review.channel_id, "review submitted");
    Ok(())
}

/// Negotiates presigned part URLs for every file of one platform.
pub async fn request_presigned_urls(
    session: &AuthSession,
    presign: &PresignRequest,
) -> Result<Vec<PresignedUpload>, ApiError> {
    let context = "requesting upload URLs";
    let request = session.request(Method::POST, PRESIGN_PATH)?.json(presign);
    let resp = send(request, context, PRESIGN_ERRORS).await?;
    let uploads = decode::<PresignResponse>(resp, context)
        .await?
        .into_uploads();
    debug!(
        platform = %presign.platform,
        files = presign.files.len(),
        uploads = uploads.len(),
        "presigned URLs issued"
    );
    Ok(uploads)
}

/// Asks the API to assemble uploaded parts into the final object.
pub async fn complete_multipart_upload(
    session: &AuthSession,
    complete: &CompleteRequest,
) -> Result<CompleteResponse, ApiError> {
    let context = "completing upload";
    let request = session.request(Method::PUT, COMPLETE_PATH)?.json(complete);
    let resp = send(request, context, COMPLETE_ERRORS).await?;
    decode(resp, context).await
}
