//! Local-identity resolution
//!
//! Verification establishes who the caller is according to the provider;
//! what that identity means locally is the embedding application's call.
//! This module defines the hook the application must supply.

use crate::provider::{ProviderApp, RemoteIdentity};
use async_trait::async_trait;

/// Application-supplied mapping from a verified provider identity to a
/// local principal.
///
/// Both methods are required and have no default: an authenticator cannot
/// be constructed without a complete resolver, so a missing implementation
/// is a compile error rather than a request-time failure.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// The application's user/account representation. Opaque to this crate.
    type Principal: Send;

    /// The provider project handle used for every verification call.
    ///
    /// The handle is long-lived and read-only; concurrent authentications
    /// share it freely.
    fn provider_app(&self) -> &ProviderApp;

    /// Look up (or create) the local principal for a verified identity.
    ///
    /// Return `None` to fail authentication for this identity without it
    /// being a provider error, e.g. when local policy rejects accounts
    /// whose email address is not verified.
    async fn resolve(&self, identity: &RemoteIdentity) -> Option<Self::Principal>;
}
