//! Sign-in handshake.
//!
//! Produces an [`AuthSession`] from an API base URL and a [`Signer`]:
//!
//! 1. bootstrap a session so the server issues its cookies
//! 2. confirm the CSRF cookie landed in the jar
//! 3. fetch the CSRF token
//! 4. build and sign the sign-in message
//! 5. post the signed message to the credentials callback
//!
//! Nothing is retried; every failure ends the handshake.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use hyperplay_protocol::constants::{
    CSRF_PATH, DEFAULT_CHAIN_ID, SESSION_PATH, SIGN_IN_CALLBACK_PATH, SIGN_IN_STATEMENT,
};
use hyperplay_protocol::messages::{CsrfResponse, SignInForm};
use reqwest::Url;
use reqwest::cookie::Jar;
use tracing::{debug, info};

use crate::error::{
    ApiError, StatusMessage, access_denied, authentication_expired, decode, send,
    validation_failed,
};
use crate::session::{AuthSession, csrf_cookie, endpoint};
use crate::siwe::SignInMessage;

/// Future returned by [`Signer::sign_message`].
pub type SignerFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ApiError>> + Send + 'a>>;

/// Holder of the identity key used to sign in.
///
/// The private key never passes through this crate; implementations
/// sign wherever the key lives (hardware wallet, external process,
/// in-memory key in tests).
pub trait Signer: Send + Sync {
    /// Address the signature must recover to.
    fn address(&self) -> &str;

    /// Signs the canonical text of a sign-in message.
    fn sign_message<'a>(&'a self, message: &'a str) -> SignerFuture<'a>;
}

/// Tunables of the handshake.
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub chain_id: u64,
    pub statement: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            statement: SIGN_IN_STATEMENT.into(),
        }
    }
}

const SESSION_ERRORS: &[(u16, StatusMessage)] = &[(401, authentication_expired)];

const CSRF_ERRORS: &[(u16, StatusMessage)] = &[
    (401, authentication_expired),
    (403, csrf_rejected),
];

const SIGN_IN_ERRORS: &[(u16, StatusMessage)] = &[
    (401, signature_rejected),
    (403, access_denied),
    (422, validation_failed),
];

fn csrf_rejected(detail: &str) -> String {
    format!("the server refused to issue a CSRF token ({detail})")
}

fn signature_rejected(detail: &str) -> String {
    format!("sign-in was rejected, the signature or nonce was not accepted ({detail})")
}

/// Runs the handshake with default options.
pub async fn authenticate(base_url: &str, signer: &dyn Signer) -> Result<AuthSession, ApiError> {
    authenticate_with(base_url, signer, &AuthOptions::default()).await
}

/// Runs the handshake.
///
/// A fresh cookie jar is created for every call; nothing is shared
/// between sessions.
pub async fn authenticate_with(
    base_url: &str,
    signer: &dyn Signer,
    options: &AuthOptions,
) -> Result<AuthSession, ApiError> {
    let base = Url::parse(base_url).map_err(|e| ApiError::Client {
        context: "parsing API base URL".into(),
        message: e.to_string(),
    })?;

    let jar = Arc::new(Jar::default());
    let http = reqwest::Client::builder()
        .cookie_provider(Arc::clone(&jar))
        .build()
        .map_err(|e| ApiError::Client {
            context: "building HTTP client".into(),
            message: e.to_string(),
        })?;

    // 1. Session bootstrap; the body is irrelevant.
    send(
        http.get(endpoint(&base, SESSION_PATH)?),
        "bootstrapping session",
        SESSION_ERRORS,
    )
    .await?;

    // 2. The CSRF cookie must exist before the token is requested.
    if csrf_cookie(&jar, &base).is_none() {
        return Err(ApiError::Precondition(
            "CSRF token not found in the cookie jar after session bootstrap; \
             the API did not issue a session cookie"
                .into(),
        ));
    }
    debug!(url = %base, "session cookie issued");

    // 3. CSRF token.
    let resp = send(
        http.get(endpoint(&base, CSRF_PATH)?),
        "fetching CSRF token",
        CSRF_ERRORS,
    )
    .await?;
    let csrf_token = decode::<CsrfResponse>(resp, "fetching CSRF token")
        .await?
        .into_token();
    if csrf_token.is_empty() {
        return Err(ApiError::Precondition(
            "the API returned an empty CSRF token".into(),
        ));
    }

    // 4. Sign-in message.
    let mut message = SignInMessage::new(
        &base,
        signer.address(),
        &csrf_token,
        options.chain_id,
        Utc::now(),
    );
    message.statement = options.statement.clone();
    let signature = signer.sign_message(&message.prepare()).await?;

    // 5. Credentials callback.
    let form = SignInForm::new(message.to_json()?, signature, csrf_token.clone());
    send(
        http.post(endpoint(&base, SIGN_IN_CALLBACK_PATH)?).form(&form),
        "signing in",
        SIGN_IN_ERRORS,
    )
    .await?;

    info!(url = %base, address = %signer.address(), "signed in");
    AuthSession::new(base, http, jar, csrf_token)
}
