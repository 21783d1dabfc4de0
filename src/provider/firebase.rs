//! Firebase token verification
//!
//! Implements [`TokenVerifier`] against Google's public endpoints the same
//! way the official admin SDKs do: RS256 signature against the published
//! securetoken keys, audience and issuer pinned to the project, expiry
//! enforced during decode. Revocation is checked only on request, since it
//! costs an account lookup per call.

use super::keys::KeyCache;
use super::{ProviderApp, ProviderError, RemoteIdentity, TokenVerifier};
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default TTL for cached signing keys (1 hour)
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// Default timeout for provider requests (5 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The ID-token claims verification depends on.
#[derive(Debug, Serialize, Deserialize)]
struct IdClaims {
    sub: String,
    exp: i64,
    #[serde(default)]
    auth_time: Option<i64>,
}

#[derive(Debug, Serialize)]
struct LookupRequest {
    #[serde(rename = "localId")]
    local_id: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<RemoteIdentity>,
}

/// Token verifier backed by the live Firebase endpoints.
///
/// Holds only shared read-only state (HTTP client, key cache); concurrent
/// verifications need no coordination.
///
/// # Example
///
/// ```no_run
/// use kagi_authn::FirebaseVerifier;
/// use std::time::Duration;
///
/// let verifier = FirebaseVerifier::new()
///     .with_timeout(Duration::from_secs(3))
///     .with_key_ttl(Duration::from_secs(600));
/// ```
pub struct FirebaseVerifier {
    client: reqwest::Client,
    keys: KeyCache,
    timeout: Duration,
    key_ttl: Duration,
}

impl FirebaseVerifier {
    pub fn new() -> Self {
        let client = reqwest::Client::new();
        Self {
            keys: KeyCache::new(client.clone(), DEFAULT_KEY_TTL, DEFAULT_TIMEOUT),
            client,
            timeout: DEFAULT_TIMEOUT,
            key_ttl: DEFAULT_KEY_TTL,
        }
    }

    /// Build a verifier from loaded configuration.
    pub fn from_config(config: &crate::config::ProviderConfig) -> Self {
        Self::new()
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_key_ttl(Duration::from_secs(config.key_ttl_secs))
    }

    /// Replace the HTTP client, e.g. to attach admin credentials via
    /// default headers or a proxy.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.keys = KeyCache::new(client.clone(), self.key_ttl, self.timeout);
        self.client = client;
        self
    }

    /// Set the timeout applied to each provider request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.keys = KeyCache::new(self.client.clone(), self.key_ttl, timeout);
        self
    }

    /// Set how long fetched signing keys are served from cache.
    #[must_use]
    pub fn with_key_ttl(mut self, ttl: Duration) -> Self {
        self.key_ttl = ttl;
        self.keys = KeyCache::new(self.client.clone(), ttl, self.timeout);
        self
    }
}

impl Default for FirebaseVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenVerifier for FirebaseVerifier {
    #[tracing::instrument(name = "auth.verify", skip_all, fields(project = %app.project_id()))]
    async fn verify(
        &self,
        token: &str,
        app: &ProviderApp,
        check_revoked: bool,
    ) -> Result<String, ProviderError> {
        let header =
            decode_header(token).map_err(|err| ProviderError::InvalidToken(err.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| ProviderError::InvalidToken("token header missing kid".into()))?;

        let key = self.keys.decoding_key(&kid, app.keys_url()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[app.project_id()]);
        validation.set_issuer(&[app.issuer()]);

        let data = decode::<IdClaims>(token, &key, &validation).map_err(|err| match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ProviderError::Expired,
            _ => ProviderError::InvalidToken(err.to_string()),
        })?;

        if data.claims.sub.is_empty() {
            return Err(ProviderError::InvalidToken("token has empty subject".into()));
        }

        if check_revoked {
            let auth_time = data
                .claims
                .auth_time
                .ok_or_else(|| ProviderError::InvalidToken("token missing auth_time".into()))?;
            let identity = self.fetch_identity(&data.claims.sub, app).await?;
            if let Some(valid_since) = identity.valid_since {
                if auth_time < valid_since.timestamp() {
                    return Err(ProviderError::Revoked);
                }
            }
        }

        Ok(data.claims.sub)
    }

    async fn fetch_identity(
        &self,
        uid: &str,
        app: &ProviderApp,
    ) -> Result<RemoteIdentity, ProviderError> {
        let request = LookupRequest {
            local_id: vec![uid.to_string()],
        };

        let response = self
            .client
            .post(app.lookup_url())
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::UserLookup(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::UserLookup(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::UserLookup(err.to_string()))?;

        body.users
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::UserLookup(format!("no account for subject {uid}")))
    }
}
