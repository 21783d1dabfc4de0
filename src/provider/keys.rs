//! Securetoken signing-key cache
//!
//! Google rotates the RSA keys that sign Firebase ID tokens and publishes
//! the current set as a JWK document. Keys are fetched lazily and cached
//! with a TTL so steady-state verification costs no network round-trip.
//! A fetch or parse failure is the environment's fault, never the
//! credential's, and classifies as [`ProviderError::CertificateFetch`].

use super::ProviderError;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A single RSA signing key from the provider's JWK document.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningKey {
    /// Key type. Securetoken keys are always "RSA".
    pub kty: String,

    /// Key ID, matched against the token header's `kid`.
    #[serde(default)]
    pub kid: Option<String>,

    #[serde(default)]
    pub alg: Option<String>,

    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url encoded)
    #[serde(default)]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded)
    #[serde(default)]
    pub e: Option<String>,
}

impl SigningKey {
    fn to_decoding_key(&self) -> Result<DecodingKey, ProviderError> {
        if self.kty != "RSA" {
            return Err(ProviderError::CertificateFetch(format!(
                "unsupported key type: {}",
                self.kty
            )));
        }

        let n = self
            .n
            .as_ref()
            .ok_or_else(|| ProviderError::CertificateFetch("key missing RSA modulus".into()))?;
        let e = self
            .e
            .as_ref()
            .ok_or_else(|| ProviderError::CertificateFetch("key missing RSA exponent".into()))?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|err| ProviderError::CertificateFetch(format!("invalid RSA key: {err}")))
    }
}

#[derive(Debug, Deserialize)]
struct KeySet {
    keys: Vec<SigningKey>,
}

struct CachedKeys {
    keys: Vec<SigningKey>,
    fetched_at: Instant,
}

/// TTL cache over the provider's published signing keys.
///
/// One cache serves one key-set URL; the URL travels with the
/// [`ProviderApp`](super::ProviderApp) handle and is passed per lookup.
/// The first lookup populates the cache, later ones refresh it once the
/// TTL has elapsed.
pub struct KeyCache {
    client: reqwest::Client,
    ttl: Duration,
    timeout: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl KeyCache {
    pub fn new(client: reqwest::Client, ttl: Duration, timeout: Duration) -> Self {
        Self {
            client,
            ttl,
            timeout,
            cache: RwLock::new(None),
        }
    }

    /// Decoding key for `kid`, fetching or refreshing the key set as
    /// needed.
    ///
    /// An unknown `kid` means the token was not signed with the
    /// provider's current keys: a credential problem, not a fetch
    /// problem.
    pub async fn decoding_key(&self, kid: &str, url: &str) -> Result<DecodingKey, ProviderError> {
        self.refresh_if_needed(url).await?;

        let cache = self.cache.read().await;
        let cached = cache
            .as_ref()
            .ok_or_else(|| ProviderError::CertificateFetch("signing keys unavailable".into()))?;

        match cached
            .keys
            .iter()
            .find(|key| key.kid.as_deref() == Some(kid))
        {
            Some(key) => key.to_decoding_key(),
            None => Err(ProviderError::InvalidToken(format!(
                "no signing key for kid {kid}"
            ))),
        }
    }

    async fn refresh_if_needed(&self, url: &str) -> Result<(), ProviderError> {
        let stale = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) => cached.fetched_at.elapsed() > self.ttl,
                None => true,
            }
        };

        if stale {
            let keys = self.fetch_keys(url).await?;
            let mut cache = self.cache.write().await;
            *cache = Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            });
        }

        Ok(())
    }

    async fn fetch_keys(&self, url: &str) -> Result<Vec<SigningKey>, ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| ProviderError::CertificateFetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::CertificateFetch(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let set: KeySet = response
            .json()
            .await
            .map_err(|err| ProviderError::CertificateFetch(err.to_string()))?;

        tracing::debug!(count = set.keys.len(), "refreshed provider signing keys");
        Ok(set.keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MODULUS: &str = "3i43LUq4ufI4uVuKAA_vv8VAUS0bCani4usLa-ors8zTFIvk7b7osLOGdrum3_zTYp4HYlVHjOgbZz1SM1u8eUcCzpY0D1yqGRPNLg7p-mnmh-YFs3l4IpupA5d4uHtWTPSXgbhpm159BIorOPKBgpwYggakkUex7lgdT-r-xPp84x82kcEAZrnt7yLnK6hcTCA5MzZuTjgT0cW9HUSQj9JAzQwcTaPj7Q_3MdYsTMgpZE3hSRIhHjT3sj0jZzvva_LqOqlUwdLo5ijYGAm_L24kXLw02GKq01MrMl-S3nWvqKsUa9m9LddY3cTSDUMXqxzIUVmiBLYw0x1c4wObnQ";

    #[test]
    fn test_parse_key_set() {
        let json = format!(
            r#"{{"keys": [{{"kty": "RSA", "kid": "key-1", "use": "sig", "alg": "RS256", "n": "{TEST_MODULUS}", "e": "AQAB"}}]}}"#
        );

        let set: KeySet = serde_json::from_str(&json).unwrap();
        assert_eq!(set.keys.len(), 1);
        assert_eq!(set.keys[0].kid.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_rsa_key_conversion() {
        let key = SigningKey {
            kty: "RSA".to_string(),
            kid: Some("key-1".to_string()),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some(TEST_MODULUS.to_string()),
            e: Some("AQAB".to_string()),
        };

        assert!(key.to_decoding_key().is_ok());
    }

    #[test]
    fn test_non_rsa_key_rejected() {
        let key = SigningKey {
            kty: "EC".to_string(),
            kid: Some("key-2".to_string()),
            alg: None,
            key_use: None,
            n: None,
            e: None,
        };

        let result = key.to_decoding_key();
        assert!(matches!(result, Err(ProviderError::CertificateFetch(_))));
    }

    #[test]
    fn test_incomplete_rsa_key_rejected() {
        let key = SigningKey {
            kty: "RSA".to_string(),
            kid: Some("key-3".to_string()),
            alg: None,
            key_use: None,
            n: Some(TEST_MODULUS.to_string()),
            e: None,
        };

        let result = key.to_decoding_key();
        assert!(matches!(result, Err(ProviderError::CertificateFetch(_))));
    }
}
