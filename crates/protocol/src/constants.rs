//! Endpoint paths and fixed protocol values.

/// Session bootstrap; only used to trigger cookie issuance.
pub const SESSION_PATH: &str = "/api/auth/session";

/// CSRF token issuance.
pub const CSRF_PATH: &str = "/api/auth/csrf";

/// Sign-in callback for the Ethereum credentials provider.
pub const SIGN_IN_CALLBACK_PATH: &str = "/api/auth/callback/ethereum";

/// Channel listing, filtered with `?project_id=`.
pub const CHANNELS_PATH: &str = "/api/v1/channels";

/// Release review submission.
pub const REVIEW_PATH: &str = "/api/v1/reviews/release";

/// Batch presigned URL negotiation.
pub const PRESIGN_PATH: &str = "/api/v1/uploads/presigned-url";

/// Multipart upload completion.
pub const COMPLETE_PATH: &str = "/api/v1/uploads/complete-multipart-upload";

/// Cookie carrying the CSRF token after session bootstrap.
///
/// Matched as a suffix so the `__Host-` prefixed variant served over
/// HTTPS is found as well.
pub const CSRF_COOKIE_NAME: &str = "next-auth.csrf-token";

/// Human-readable statement embedded in the sign-in message.
pub const SIGN_IN_STATEMENT: &str = "Sign in with Ethereum to HyperPlay";

/// Sign-in message format version.
pub const SIGN_IN_VERSION: &str = "1";

/// Chain identifier used in the sign-in message (Polygon mainnet).
pub const DEFAULT_CHAIN_ID: u64 = 137;

/// Version tag written into every release metadata document.
pub const METADATA_VERSION: &str = "2";

/// Upload `type` discriminator for release artifacts.
pub const UPLOAD_TYPE_RELEASE: &str = "release";

/// Platform key whose folder is uploaded file by file instead of as one object.
pub const MULTI_FILE_PLATFORM: &str = "web";

/// MIME type used when the extension is unknown.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";
