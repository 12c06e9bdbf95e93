//! Structured sign-in message (EIP-4361).

use chrono::{DateTime, SecondsFormat, Utc};
use hyperplay_protocol::constants::{SIGN_IN_STATEMENT, SIGN_IN_VERSION};
use reqwest::Url;
use serde::Serialize;

/// The challenge an identity holder signs to prove control of an address.
///
/// [`prepare`](Self::prepare) yields the canonical text that is signed;
/// the JSON form travels alongside the signature in the callback form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInMessage {
    pub domain: String,
    pub address: String,
    pub statement: String,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    /// Anti-replay nonce; the CSRF token of the session.
    pub nonce: String,
    pub issued_at: String,
}

impl SignInMessage {
    pub fn new(
        base_url: &Url,
        address: &str,
        nonce: &str,
        chain_id: u64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let host = base_url.host_str().unwrap_or_default();
        let domain = match base_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Self {
            domain,
            address: address.to_string(),
            statement: SIGN_IN_STATEMENT.to_string(),
            uri: base_url.as_str().trim_end_matches('/').to_string(),
            version: SIGN_IN_VERSION.to_string(),
            chain_id,
            nonce: nonce.to_string(),
            issued_at: issued_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Canonical text representation that the signer signs.
    pub fn prepare(&self) -> String {
        format!(
            "{domain} wants you to sign in with your Ethereum account:\n\
             {address}\n\
             \n\
             {statement}\n\
             \n\
             URI: {uri}\n\
             Version: {version}\n\
             Chain ID: {chain_id}\n\
             Nonce: {nonce}\n\
             Issued At: {issued_at}",
            domain = self.domain,
            address = self.address,
            statement = self.statement,
            uri = self.uri,
            version = self.version,
            chain_id = self.chain_id,
            nonce = self.nonce,
            issued_at = self.issued_at,
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
