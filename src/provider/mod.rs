//! Identity-provider boundary
//!
//! Everything this crate needs from Firebase goes through the
//! [`TokenVerifier`] trait: verify an ID token, fetch the account record
//! behind it. Provider failures are classified into the closed
//! [`ProviderError`] enum here, once, so the rest of the crate never sees
//! SDK- or transport-specific error shapes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub mod firebase;
pub mod keys;

pub use firebase::FirebaseVerifier;

/// Default endpoint publishing the securetoken signing keys as a JWK set.
pub const DEFAULT_KEYS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Default account-lookup endpoint.
pub const DEFAULT_LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

/// Provider-side failure classification
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The credential is malformed, carries the wrong claims, or was not
    /// signed by the provider.
    #[error("invalid ID token: {0}")]
    InvalidToken(String),

    /// The credential was valid once; its validity window has passed.
    #[error("ID token expired")]
    Expired,

    /// The credential was explicitly invalidated after issuance.
    #[error("ID token revoked")]
    Revoked,

    /// The provider's trust material could not be fetched. The caller's
    /// environment is at fault, not the credential.
    #[error("signing key fetch failed: {0}")]
    CertificateFetch(String),

    /// The account record behind a verified subject could not be fetched.
    #[error("account lookup failed: {0}")]
    UserLookup(String),
}

/// Long-lived handle to the configured Firebase project.
///
/// Shared read-only across concurrent authentications; this crate never
/// mutates it. Endpoint overrides exist for emulators and tests.
#[derive(Debug, Clone)]
pub struct ProviderApp {
    project_id: String,
    keys_url: Option<String>,
    lookup_url: Option<String>,
}

impl ProviderApp {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            keys_url: None,
            lookup_url: None,
        }
    }

    /// Build a handle from loaded configuration.
    pub fn from_config(config: &crate::config::ProviderConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            keys_url: config.keys_url.clone(),
            lookup_url: config.lookup_url.clone(),
        }
    }

    /// Override the signing-key endpoint.
    #[must_use]
    pub fn with_keys_url(mut self, url: &str) -> Self {
        self.keys_url = Some(url.to_string());
        self
    }

    /// Override the account-lookup endpoint.
    #[must_use]
    pub fn with_lookup_url(mut self, url: &str) -> Self {
        self.lookup_url = Some(url.to_string());
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Issuer expected in tokens minted for this project.
    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    pub fn keys_url(&self) -> &str {
        self.keys_url.as_deref().unwrap_or(DEFAULT_KEYS_URL)
    }

    pub fn lookup_url(&self) -> &str {
        self.lookup_url.as_deref().unwrap_or(DEFAULT_LOOKUP_URL)
    }
}

/// Canonical account record for a verified subject, as returned by the
/// provider's accounts:lookup endpoint. Produced fresh per request and
/// handed to the application's resolver; never cached here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIdentity {
    /// The provider's stable unique id for the subject.
    #[serde(rename = "localId")]
    pub uid: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub disabled: bool,

    /// Tokens issued before this instant have been invalidated.
    #[serde(default, deserialize_with = "de_epoch_seconds")]
    pub valid_since: Option<DateTime<Utc>>,
}

/// The lookup API reports `validSince` as epoch seconds in a string.
fn de_epoch_seconds<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Text(String),
    }

    let secs = match Option::<Raw>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Raw::Num(n)) => n,
        Some(Raw::Text(s)) => s.parse::<i64>().map_err(serde::de::Error::custom)?,
    };
    Ok(DateTime::from_timestamp(secs, 0))
}

/// Remote verification boundary.
///
/// `verify` confirms the credential with the provider and returns its
/// stable subject id; `fetch_identity` pulls the full account record for
/// that id. Both are single network operations from the caller's point of
/// view; no retries happen at this layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(
        &self,
        token: &str,
        app: &ProviderApp,
        check_revoked: bool,
    ) -> Result<String, ProviderError>;

    async fn fetch_identity(
        &self,
        uid: &str,
        app: &ProviderApp,
    ) -> Result<RemoteIdentity, ProviderError>;
}
