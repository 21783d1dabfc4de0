//! Authorization-header parsing
//!
//! Lifts the bearer credential out of a raw `Authorization` header value.
//! The first whitespace-delimited token must match the configured scheme
//! keyword (case-insensitive); everything after it is the credential,
//! verbatim.

use super::AuthError;

/// Default scheme keyword expected in the `Authorization` header.
pub const DEFAULT_KEYWORD: &str = "FirebaseToken";

/// An opaque Firebase ID token extracted from the `Authorization` header.
///
/// Invariants: non-empty, no embedded whitespace, valid UTF-8. The raw
/// value is kept out of `Debug` output so tokens cannot leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct IdToken(String);

impl IdToken {
    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper, yielding the raw token string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for IdToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdToken(***)")
    }
}

/// Parse a raw `Authorization` header value against `keyword`.
///
/// Returns `Ok(None)` when the header is absent, blank, or carries a
/// different scheme: the request is simply not ours, and other
/// authenticators in a chain may still claim it. A header that does open
/// with our keyword but is malformed is rejected.
pub fn extract_token(header: Option<&[u8]>, keyword: &str) -> Result<Option<IdToken>, AuthError> {
    let raw = match header {
        Some(raw) => raw,
        None => return Ok(None),
    };

    let mut parts = raw
        .split(|b: &u8| b.is_ascii_whitespace())
        .filter(|part| !part.is_empty());

    // A whitespace-only value yields zero tokens and passes through,
    // same as an absent header.
    let scheme = match parts.next() {
        Some(scheme) => scheme,
        None => return Ok(None),
    };
    if !scheme.eq_ignore_ascii_case(keyword.as_bytes()) {
        return Ok(None);
    }

    let credential = parts.next().ok_or(AuthError::MissingCredential)?;
    if parts.next().is_some() {
        return Err(AuthError::TokenContainsWhitespace);
    }

    let token = std::str::from_utf8(credential).map_err(|_| AuthError::InvalidTextEncoding)?;
    Ok(Some(IdToken(token.to_string())))
}
