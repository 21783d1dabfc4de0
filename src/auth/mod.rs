//! Request authentication
//!
//! Clients authenticate by passing a Firebase ID token in the
//! `Authorization` header, prefixed with the configured scheme keyword:
//!
//! ```text
//! Authorization: FirebaseToken xxxxx.yyyyy.zzzzz
//! ```
//!
//! Each request gets a single pass through the pipeline: parse the header,
//! verify the token with the provider, resolve the verified identity to a
//! local principal. No stage retries, and nothing is cached between
//! requests, since a token's validity can change between requests.

use crate::provider::{ProviderError, TokenVerifier};
use thiserror::Error;

pub mod header;
pub mod resolver;

pub use header::{extract_token, IdToken, DEFAULT_KEYWORD};
pub use resolver::IdentityResolver;

/// Authentication rejections
///
/// Every variant terminates the current attempt and maps to a 401-class
/// response in the embedding framework. Messages are user-facing; the
/// variants keep "bad client" distinguishable from "bad environment".
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid token header. No credentials provided.")]
    MissingCredential,

    #[error("Invalid token header. Token string should not contain spaces.")]
    TokenContainsWhitespace,

    #[error("Invalid token header. Token string should not contain invalid characters.")]
    InvalidTextEncoding,

    #[error("The Firebase token was invalid.")]
    InvalidToken,

    #[error("The Firebase token has expired.")]
    ExpiredToken,

    #[error("The Firebase token has been revoked.")]
    RevokedToken,

    #[error("Temporarily unable to verify the ID token.")]
    ProviderUnavailable,

    #[error("No matching local user found.")]
    NoMatchingPrincipal,
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidToken(_) => AuthError::InvalidToken,
            ProviderError::Expired => AuthError::ExpiredToken,
            ProviderError::Revoked => AuthError::RevokedToken,
            ProviderError::CertificateFetch(_) | ProviderError::UserLookup(_) => {
                AuthError::ProviderUnavailable
            }
        }
    }
}

/// Classify a provider failure, logging the ones that indicate a
/// dependency outage rather than a bad credential.
fn classify(err: ProviderError) -> AuthError {
    if matches!(
        err,
        ProviderError::CertificateFetch(_) | ProviderError::UserLookup(_)
    ) {
        tracing::warn!(error = %err, "identity provider unreachable");
    }
    err.into()
}

/// Result of one authentication pass.
///
/// `Skipped` is the neutral "not ours" signal: the request carried no
/// credential under this authenticator's scheme, and other authenticators
/// in a chain may still claim it. Rejections travel as [`AuthError`], so
/// the full outcome is the three-way `Skipped` / `Authenticated` / `Err`.
#[derive(Debug)]
pub enum AuthOutcome<P> {
    /// No applicable credential; not a failure.
    Skipped,
    /// Verified and resolved. Carries the principal and the credential
    /// that authenticated it.
    Authenticated { principal: P, token: IdToken },
}

/// Firebase bearer-token authenticator.
///
/// Generic over the provider client and the application-supplied resolver;
/// both are fixed at construction, so an unconfigured authenticator cannot
/// exist. Holds no per-request state: identical inputs produce identical
/// outcomes, and concurrent passes share nothing mutable.
///
/// # Example
///
/// ```no_run
/// use kagi_authn::{AuthOutcome, FirebaseVerifier, TokenAuthenticator};
/// # use kagi_authn::{IdentityResolver, ProviderApp, RemoteIdentity};
/// # use async_trait::async_trait;
/// # struct UserStore(ProviderApp);
/// # #[async_trait]
/// # impl IdentityResolver for UserStore {
/// #     type Principal = String;
/// #     fn provider_app(&self) -> &ProviderApp { &self.0 }
/// #     async fn resolve(&self, identity: &RemoteIdentity) -> Option<String> {
/// #         Some(identity.uid.clone())
/// #     }
/// # }
///
/// # async fn example(store: UserStore) -> Result<(), kagi_authn::AuthError> {
/// let authn = TokenAuthenticator::new(FirebaseVerifier::new(), store);
///
/// match authn.authenticate(Some(b"FirebaseToken xxxxx.yyyyy.zzzzz")).await? {
///     AuthOutcome::Authenticated { principal, .. } => println!("hello {principal}"),
///     AuthOutcome::Skipped => println!("not ours, try the next authenticator"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct TokenAuthenticator<V, R> {
    verifier: V,
    resolver: R,
    keyword: String,
    check_revoked: bool,
}

impl<V, R> TokenAuthenticator<V, R>
where
    V: TokenVerifier,
    R: IdentityResolver,
{
    /// Create an authenticator with the default keyword and the revocation
    /// check disabled.
    pub fn new(verifier: V, resolver: R) -> Self {
        Self {
            verifier,
            resolver,
            keyword: DEFAULT_KEYWORD.to_string(),
            check_revoked: false,
        }
    }

    /// Create an authenticator from loaded configuration.
    pub fn from_config(config: &crate::config::AuthConfig, verifier: V, resolver: R) -> Self {
        Self {
            verifier,
            resolver,
            keyword: config.keyword.clone(),
            check_revoked: config.check_revoked,
        }
    }

    /// Override the scheme keyword matched in the `Authorization` header.
    #[must_use]
    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.keyword = keyword.to_string();
        self
    }

    /// Enable the provider-side revocation check.
    ///
    /// Off by default: the check costs an extra account lookup on every
    /// request, trading freshness for latency.
    #[must_use]
    pub fn with_check_revoked(mut self, check_revoked: bool) -> Self {
        self.check_revoked = check_revoked;
        self
    }

    /// Value for the `WWW-Authenticate` header on rejected requests.
    pub fn challenge(&self) -> &str {
        &self.keyword
    }

    /// Run one authentication pass over a raw `Authorization` header value.
    pub async fn authenticate(
        &self,
        authorization: Option<&[u8]>,
    ) -> Result<AuthOutcome<R::Principal>, AuthError> {
        let token = match header::extract_token(authorization, &self.keyword)? {
            Some(token) => token,
            None => return Ok(AuthOutcome::Skipped),
        };
        self.authenticate_credential(token).await
    }

    /// Verify-then-resolve for an already extracted credential.
    pub async fn authenticate_credential(
        &self,
        token: IdToken,
    ) -> Result<AuthOutcome<R::Principal>, AuthError> {
        let app = self.resolver.provider_app();

        let uid = self
            .verifier
            .verify(token.as_str(), app, self.check_revoked)
            .await
            .map_err(classify)?;

        let identity = self
            .verifier
            .fetch_identity(&uid, app)
            .await
            .map_err(classify)?;

        match self.resolver.resolve(&identity).await {
            Some(principal) => {
                tracing::info!(subject = %identity.uid, "request authenticated");
                Ok(AuthOutcome::Authenticated { principal, token })
            }
            None => Err(AuthError::NoMatchingPrincipal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockTokenVerifier, ProviderApp, RemoteIdentity};
    use async_trait::async_trait;

    struct StaticResolver {
        app: ProviderApp,
        principal: Option<&'static str>,
    }

    impl StaticResolver {
        fn some(principal: &'static str) -> Self {
            Self {
                app: ProviderApp::new("test-project"),
                principal: Some(principal),
            }
        }

        fn none() -> Self {
            Self {
                app: ProviderApp::new("test-project"),
                principal: None,
            }
        }
    }

    #[async_trait]
    impl IdentityResolver for StaticResolver {
        type Principal = String;

        fn provider_app(&self) -> &ProviderApp {
            &self.app
        }

        async fn resolve(&self, _identity: &RemoteIdentity) -> Option<String> {
            self.principal.map(str::to_string)
        }
    }

    fn identity(uid: &str) -> RemoteIdentity {
        RemoteIdentity {
            uid: uid.to_string(),
            email: Some("a@example.com".into()),
            email_verified: true,
            display_name: None,
            disabled: false,
            valid_since: None,
        }
    }

    #[tokio::test]
    async fn test_scheme_mismatch_is_skipped_not_rejected() {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().never();

        let authn = TokenAuthenticator::new(verifier, StaticResolver::some("alice"));
        let outcome = authn.authenticate(Some(b"Bearer abc")).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_successful_pass() {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .returning(|_, _, _| Ok("uid-1".to_string()));
        verifier
            .expect_fetch_identity()
            .returning(|uid, _| Ok(identity(uid)));

        let authn = TokenAuthenticator::new(verifier, StaticResolver::some("alice"));
        let outcome = authn
            .authenticate(Some(b"FirebaseToken good-token"))
            .await
            .unwrap();

        match outcome {
            AuthOutcome::Authenticated { principal, token } => {
                assert_eq!(principal, "alice");
                assert_eq!(token.as_str(), "good-token");
            }
            other => panic!("expected Authenticated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verification_failure_skips_identity_fetch() {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .returning(|_, _, _| Err(ProviderError::Expired));
        verifier.expect_fetch_identity().never();

        let authn = TokenAuthenticator::new(verifier, StaticResolver::some("alice"));
        let result = authn.authenticate(Some(b"FirebaseToken stale")).await;
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
    }

    #[tokio::test]
    async fn test_resolver_none_is_no_matching_principal() {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .returning(|_, _, _| Ok("uid-1".to_string()));
        verifier
            .expect_fetch_identity()
            .returning(|uid, _| Ok(identity(uid)));

        let authn = TokenAuthenticator::new(verifier, StaticResolver::none());
        let result = authn.authenticate(Some(b"FirebaseToken good-token")).await;
        assert!(matches!(result, Err(AuthError::NoMatchingPrincipal)));
    }

    #[tokio::test]
    async fn test_check_revoked_flag_reaches_verifier() {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .withf(|_, _, check_revoked| *check_revoked)
            .returning(|_, _, _| Ok("uid-1".to_string()));
        verifier
            .expect_fetch_identity()
            .returning(|uid, _| Ok(identity(uid)));

        let authn = TokenAuthenticator::new(verifier, StaticResolver::some("alice"))
            .with_check_revoked(true);
        let outcome = authn.authenticate(Some(b"FirebaseToken t")).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Authenticated { .. }));
    }

    #[tokio::test]
    async fn test_identity_fetch_failure_is_provider_unavailable() {
        let mut verifier = MockTokenVerifier::new();
        verifier
            .expect_verify()
            .returning(|_, _, _| Ok("uid-1".to_string()));
        verifier
            .expect_fetch_identity()
            .returning(|_, _| Err(ProviderError::UserLookup("HTTP 503".into())));

        let authn = TokenAuthenticator::new(verifier, StaticResolver::some("alice"));
        let result = authn.authenticate(Some(b"FirebaseToken t")).await;
        assert!(matches!(result, Err(AuthError::ProviderUnavailable)));
    }

    #[test]
    fn test_challenge_exposes_keyword() {
        let authn = TokenAuthenticator::new(MockTokenVerifier::new(), StaticResolver::none());
        assert_eq!(authn.challenge(), "FirebaseToken");

        let authn = TokenAuthenticator::new(MockTokenVerifier::new(), StaticResolver::none())
            .with_keyword("MyToken");
        assert_eq!(authn.challenge(), "MyToken");
    }
}
