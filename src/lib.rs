//! Kagi Authn Library
//!
//! Pluggable Firebase ID-token authentication for Rust HTTP services.
//!
//! Clients authenticate by passing a Firebase ID token in the
//! `Authorization` header, prefixed with the scheme keyword
//! (`FirebaseToken` by default):
//!
//! ```text
//! Authorization: FirebaseToken xxxxx.yyyyy.zzzzz
//! ```
//!
//! # Features
//!
//! - **Pluggable**: returns a neutral "skipped" signal for foreign
//!   schemes, so authenticators can be chained
//! - **Classified failures**: invalid, expired, revoked, and
//!   provider-outage rejections stay distinguishable
//! - **Application-owned identity mapping**: the [`IdentityResolver`]
//!   hook decides which local principal a verified identity becomes
//! - **Optional revocation check**: off by default, trading freshness
//!   for one less provider round-trip per request
//!
//! # Example
//!
//! ```no_run
//! use kagi_authn::{
//!     AuthOutcome, FirebaseVerifier, IdentityResolver, ProviderApp, RemoteIdentity,
//!     TokenAuthenticator,
//! };
//! use async_trait::async_trait;
//!
//! struct UserStore {
//!     app: ProviderApp,
//! }
//!
//! #[async_trait]
//! impl IdentityResolver for UserStore {
//!     type Principal = String;
//!
//!     fn provider_app(&self) -> &ProviderApp {
//!         &self.app
//!     }
//!
//!     async fn resolve(&self, identity: &RemoteIdentity) -> Option<String> {
//!         // Local policy: only accounts with a verified email get in.
//!         identity.email_verified.then(|| identity.uid.clone())
//!     }
//! }
//!
//! # async fn example() -> Result<(), kagi_authn::AuthError> {
//! let store = UserStore {
//!     app: ProviderApp::new("my-project"),
//! };
//! let authn = TokenAuthenticator::new(FirebaseVerifier::new(), store);
//!
//! match authn.authenticate(Some(b"FirebaseToken xxxxx.yyyyy.zzzzz")).await? {
//!     AuthOutcome::Authenticated { principal, .. } => println!("hello {principal}"),
//!     AuthOutcome::Skipped => println!("not ours, try the next authenticator"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod provider;

// Re-export commonly used types
pub use auth::{AuthError, AuthOutcome, IdToken, IdentityResolver, TokenAuthenticator};
pub use config::Config;
pub use provider::{FirebaseVerifier, ProviderApp, ProviderError, RemoteIdentity, TokenVerifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
