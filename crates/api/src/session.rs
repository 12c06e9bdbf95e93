//! Authorized session state.

use std::sync::Arc;

use hyperplay_protocol::constants::CSRF_COOKIE_NAME;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, RequestBuilder, Url};

use crate::error::ApiError;

/// Cookie-bearing session produced by the sign-in handshake.
///
/// Holds the HTTP client wired to the session's cookie jar and the CSRF
/// token. It is never persisted; dropping it ends the session. After
/// the handshake the jar is only read.
#[derive(Clone)]
pub struct AuthSession {
    base_url: Url,
    http: reqwest::Client,
    jar: Arc<Jar>,
    csrf_token: String,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Assembles a session; the CSRF token must be non-empty.
    pub(crate) fn new(
        base_url: Url,
        http: reqwest::Client,
        jar: Arc<Jar>,
        csrf_token: String,
    ) -> Result<Self, ApiError> {
        if csrf_token.is_empty() {
            return Err(missing_csrf());
        }
        Ok(Self {
            base_url,
            http,
            jar,
            csrf_token,
        })
    }

    #[cfg(test)]
    pub(crate) fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Raw `Cookie` header the session would send to its API.
    #[cfg(test)]
    pub(crate) fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }

    /// Starts an authenticated request to `path` on the API.
    ///
    /// Authentication rides on the session cookies; the CSRF token is
    /// only part of the sign-in form.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        if self.csrf_token.is_empty() {
            return Err(missing_csrf());
        }
        let url = endpoint(&self.base_url, path)?;
        Ok(self.http.request(method, url))
    }
}

/// Resolves an absolute API path against the base URL.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Result<Url, ApiError> {
    base_url.join(path).map_err(|e| ApiError::Client {
        context: format!("resolving {path}"),
        message: e.to_string(),
    })
}

/// Finds the CSRF token cookie the API issued for `url`.
///
/// Matches any cookie whose name ends with the CSRF cookie name, so
/// both the plain and the `__Host-` prefixed variants are accepted.
pub(crate) fn csrf_cookie(jar: &Jar, url: &Url) -> Option<String> {
    let header = jar.cookies(url)?;
    let cookies = header.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| name.ends_with(CSRF_COOKIE_NAME) && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn missing_csrf() -> ApiError {
    ApiError::Precondition(
        "no CSRF token in the session; sign in before calling authenticated endpoints".into(),
    )
}
