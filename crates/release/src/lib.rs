//! Release publish flow: package, collect, upload, submit.
//!
//! This crate holds the business logic of publishing a release. It has
//! no transport of its own; [`UploadBackend`] and [`ReleaseApi`] are
//! implemented over an authenticated API session by [`SessionBackend`].
//!
//! # Pipeline
//!
//! 1. **Package**: folders flagged `zip` are archived into the work dir
//! 2. **Collect**: each platform becomes one or more upload units
//! 3. **Upload**: batch presign, concurrent part PUTs, completion
//! 4. **Assemble**: one [`ReleaseMeta`](hyperplay_protocol::ReleaseMeta)
//!    entry per platform, only if every platform succeeded
//! 5. **Submit**: resolve the channel by name and queue the review

pub mod backend;
pub mod collector;
pub mod error;
pub mod packaging;
pub mod publish;
pub mod types;
pub mod uploader;

#[cfg(test)]
pub(crate) mod mock;

// Re-export primary types for convenience.
pub use backend::{BackendFuture, ReleaseApi, SessionBackend, UploadBackend};
pub use collector::{collect_units, mime_type};
pub use error::{PlatformFailure, PublishError};
pub use packaging::{archive_path, prepare_entry};
pub use publish::{ReleasePublisher, resolve_location};
pub use types::{
    PlatformEntry, PlatformSpec, PublishEvent, PublishOptions, ReleaseConfig, ReleaseId,
    UploadEvent, UploadUnit,
};
pub use uploader::MultipartUploader;
