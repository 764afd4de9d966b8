//! Identity types derived from verified token claims.
//!
//! Each trusted issuer declares which claim shape its tokens carry; the
//! mapping travels with the signing keys so the verifier can hand the
//! normalizer the right variant without re-consulting configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an issuer's verified claims become a normalized identity.
///
/// Carried in issuer configuration and attached to every signing-key entry
/// that issuer publishes. The mapping of the key that verified a token
/// selects the normalizer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimsMapping {
    /// Corporate SSO tokens: display name, a JSON-encoded group list, and
    /// an external identity array.
    Sso,

    /// First-party account tokens: subject id and email.
    Native,
}

/// Identity derived from a corporate SSO token.
///
/// `username` is the stable external identifier (the first entry of the
/// token's identity array) and is guaranteed non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct SsoIdentity {
    /// Display name from the `name` claim; may be empty.
    pub name: String,

    /// Access groups, in token order.
    pub groups: Vec<String>,

    /// Stable external user identifier. Never empty.
    pub username: String,
}

/// Custom Debug implementation that redacts personal fields.
impl fmt::Debug for SsoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsoIdentity")
            .field("name", &"[REDACTED]")
            .field("groups", &self.groups)
            .field("username", &"[REDACTED]")
            .finish()
    }
}

/// Identity derived from a first-party account token.
#[derive(Clone, PartialEq, Eq)]
pub struct NativeIdentity {
    /// Account identifier from the `sub` claim. Never empty.
    pub user_id: String,

    /// Email from the `email` claim; may be empty.
    pub email: String,
}

/// Custom Debug implementation that redacts personal fields.
impl fmt::Debug for NativeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeIdentity")
            .field("user_id", &"[REDACTED]")
            .field("email", &"[REDACTED]")
            .finish()
    }
}

/// A normalized identity, tagged by the claim shape it came from.
///
/// Downstream header stamping emits one header per field of the inner
/// variant, so the tag decides the outbound header set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedIdentity {
    /// Derived via [`ClaimsMapping::Sso`].
    Sso(SsoIdentity),

    /// Derived via [`ClaimsMapping::Native`].
    Native(NativeIdentity),
}
