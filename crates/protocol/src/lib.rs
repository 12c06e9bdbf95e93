//! Wire types for the HyperPlay publishing API.
//!
//! Everything that crosses a process boundary lives here: endpoint
//! paths, request/response payloads, and the release metadata document
//! that is handed to the ledger once all platforms are uploaded.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{
    Channel, CompleteRequest, CompleteResponse, CompletedPart, CsrfResponse, PartUrl,
    PresignFile, PresignRequest, PresignResponse, PresignedUpload, ReviewRequest, SignInForm,
};
pub use types::{PlatformArtifact, ReleaseMeta, release_path};
