//! Client for the HyperPlay publishing API.
//!
//! # Flow
//!
//! 1. [`authenticate`] runs the session / CSRF / sign-in handshake and
//!    returns an [`AuthSession`].
//! 2. The session is passed explicitly to every authenticated call in
//!    [`endpoints`].
//! 3. Part data goes straight to the object store through presigned
//!    URLs with [`ObjectStore`], which needs no session.
//!
//! Every failure is classified into an [`ApiError`] with a message the
//! user can act on.

pub mod auth;
pub mod endpoints;
pub mod error;
pub mod session;
pub mod siwe;
pub mod store;

#[cfg(test)]
pub(crate) mod mock;

// Re-export primary types for convenience.
pub use auth::{AuthOptions, Signer, SignerFuture, authenticate, authenticate_with};
pub use error::{ApiError, HttpFailure, StatusMessage, classify};
pub use session::AuthSession;
pub use siwe::SignInMessage;
pub use store::ObjectStore;
