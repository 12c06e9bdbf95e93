//! Failure classification.
//!
//! Every call site passes its own status table, so each endpoint keeps
//! its own error vocabulary. Classification never decides whether a
//! call is retried; it only produces the diagnostic.

use serde::de::DeserializeOwned;

/// Builds a user-facing message from the body-derived server message.
pub type StatusMessage = fn(&str) -> String;

/// Longest body excerpt carried into a message.
const MAX_BODY_EXCERPT: usize = 200;

/// Errors produced by the publishing API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required piece of state is missing. Never retried.
    #[error("{0}")]
    Precondition(String),

    /// The server answered with an error status.
    #[error("{context}: {message}")]
    Rejected {
        context: String,
        status: u16,
        message: String,
    },

    /// The request went out but no response came back.
    #[error(
        "{context}: no response from the server ({source}); check your internet connection and try again"
    )]
    Connectivity {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be built or sent at all.
    #[error("{context}: request could not be sent ({message}); check the API URL and client settings")]
    Client { context: String, message: String },

    /// The server answered successfully with a body we cannot read.
    #[error("{context}: unexpected response body ({source})")]
    Decode {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: object store response carried no ETag header")]
    MissingEtag { context: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signer error: {0}")]
    Signer(String),
}

impl ApiError {
    /// HTTP status for rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

/// A failed HTTP interaction, before classification.
#[derive(Debug)]
pub enum HttpFailure {
    /// The server responded with a non-success status.
    Status { status: u16, body: String },
    /// The request failed below HTTP.
    Transport(reqwest::Error),
}

/// Converts a failed interaction into a typed, user-facing error.
///
/// `handlers` maps status codes to context-specific messages; unmapped
/// statuses fall back to a generic message carrying the raw status and
/// the server's own explanation.
pub fn classify(failure: HttpFailure, context: &str, handlers: &[(u16, StatusMessage)]) -> ApiError {
    match failure {
        HttpFailure::Status { status, body } => {
            let detail = body_message(&body);
            let message = handlers
                .iter()
                .find(|(code, _)| *code == status)
                .map(|(_, handler)| handler(&detail))
                .unwrap_or_else(|| {
                    format!(
                        "unexpected response (HTTP {status}): {detail}. Please contact support if this keeps happening"
                    )
                });
            ApiError::Rejected {
                context: context.to_string(),
                status,
                message,
            }
        }
        HttpFailure::Transport(err) if err.is_builder() => ApiError::Client {
            context: context.to_string(),
            message: err.to_string(),
        },
        HttpFailure::Transport(err) => ApiError::Connectivity {
            context: context.to_string(),
            source: err,
        },
    }
}

/// Extracts a readable message from an error body.
///
/// JSON bodies contribute their `message` or `error` field; anything
/// else is trimmed and truncated.
fn body_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str())
                && !msg.is_empty()
            {
                return msg.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no details provided".into();
    }
    match trimmed.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Sends a request and classifies any failure, including error statuses.
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
    context: &str,
    handlers: &[(u16, StatusMessage)],
) -> Result<reqwest::Response, ApiError> {
    let resp = request
        .send()
        .await
        .map_err(|e| classify(HttpFailure::Transport(e), context, handlers))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(classify(
            HttpFailure::Status {
                status: status.as_u16(),
                body,
            },
            context,
            handlers,
        ));
    }

    Ok(resp)
}

/// Decodes a successful JSON response.
pub(crate) async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    context: &str,
) -> Result<T, ApiError> {
    resp.json::<T>().await.map_err(|source| ApiError::Decode {
        context: context.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Messages shared by several endpoint tables
// ---------------------------------------------------------------------------

pub(crate) fn authentication_expired(_: &str) -> String {
    "authentication expired or was not accepted; sign in again".into()
}

pub(crate) fn access_denied(detail: &str) -> String {
    format!("access denied, this account is not a member of the project ({detail})")
}

pub(crate) fn validation_failed(detail: &str) -> String {
    format!("the request was rejected as invalid: {detail}")
}
