use serde::{Deserialize, Serialize};

use crate::constants::UPLOAD_TYPE_RELEASE;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Body of the CSRF issuance endpoint.
///
/// Deployed versions answer either `{"csrfToken": ".."}` or
/// `{"data": {"csrfToken": ".."}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CsrfResponse {
    Direct {
        #[serde(rename = "csrfToken")]
        csrf_token: String,
    },
    Wrapped {
        data: CsrfData,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CsrfData {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

impl CsrfResponse {
    /// Returns the token regardless of envelope.
    pub fn into_token(self) -> String {
        match self {
            Self::Direct { csrf_token } => csrf_token,
            Self::Wrapped { data } => data.csrf_token,
        }
    }
}

/// Form-encoded body of the sign-in callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInForm {
    /// JSON serialization of the structured sign-in message.
    pub message: String,
    pub redirect: String,
    pub signature: String,
    pub csrf_token: String,
    pub callback_url: String,
    pub json: String,
}

impl SignInForm {
    pub fn new(message: String, signature: String, csrf_token: String) -> Self {
        Self {
            message,
            redirect: "false".into(),
            signature,
            csrf_token,
            callback_url: "/".into(),
            json: "true".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Channels and review
// ---------------------------------------------------------------------------

/// A release channel of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: u64,
    pub channel_name: String,
}

/// Queues a release for review on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Canonical release path, `account/project/release`.
    pub path: String,
    pub channel_id: u64,
}

// ---------------------------------------------------------------------------
// Multipart upload
// ---------------------------------------------------------------------------

/// One file announced during presigned URL negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignFile {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
}

/// Batch request for presigned part URLs of one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignRequest {
    pub account: String,
    pub project: String,
    pub release: String,
    pub platform: String,
    pub files: Vec<PresignFile>,
    #[serde(rename = "type")]
    pub upload_type: String,
}

impl PresignRequest {
    pub fn release(
        account: &str,
        project: &str,
        release: &str,
        platform: &str,
        files: Vec<PresignFile>,
    ) -> Self {
        Self {
            account: account.to_string(),
            project: project.to_string(),
            release: release.to_string(),
            platform: platform.to_string(),
            files,
            upload_type: UPLOAD_TYPE_RELEASE.to_string(),
        }
    }
}

/// A signed URL for a single part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUrl {
    pub part_number: u32,
    pub url: String,
}

/// Upload descriptor issued for one announced file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub file_name: String,
    pub upload_id: String,
    pub key: String,
    pub part_urls: Vec<PartUrl>,
}

/// Body of the presign endpoint: a bare list or an `uploadDetails` envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PresignResponse {
    Envelope {
        #[serde(rename = "uploadDetails")]
        upload_details: Vec<PresignedUpload>,
    },
    List(Vec<PresignedUpload>),
}

impl PresignResponse {
    pub fn into_uploads(self) -> Vec<PresignedUpload> {
        match self {
            Self::Envelope { upload_details } => upload_details,
            Self::List(uploads) => uploads,
        }
    }
}

/// A part acknowledged by the object store.
///
/// Field names follow the object store's own completion vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// Assembles the uploaded parts into the final object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub upload_id: String,
    pub key: String,
    /// Ascending by part number.
    pub parts: Vec<CompletedPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub location: String,
}
