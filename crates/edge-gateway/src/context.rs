//! Per-request context.
//!
//! Every proxied request gets a context built before dispatch: the cached
//! signing keys, the verified caller identity when a token is present,
//! the raw token held for propagation, and the client headers that travel
//! on to subgraphs. Requests without credentials still get a context;
//! they simply carry no identity.

use crate::auth::identity;
use crate::auth::jwks::{IssuerKeyStore, SigningKeySet};
use crate::auth::jwt::TokenVerifier;
use crate::auth::NormalizedIdentity;
use crate::errors::GatewayError;
use crate::services::propagation::{
    extract_header, HEADER_FORWARDED_FOR, HEADER_ORIGIN_CLIENT_IP, HEADER_REQUIRE_PREFLIGHT,
};
use axum::http::{HeaderMap, HeaderName};
use common::secret::SecretString;
use std::fmt;
use std::sync::Arc;

/// Context for one proxied request.
pub struct RequestContext {
    /// Raw bearer token, exposed only at the propagation site.
    raw_token: Option<SecretString>,

    /// Signing key set the token was verified against.
    public_keys: Arc<SigningKeySet>,

    /// Verified caller identity, `None` for anonymous requests.
    identity: Option<NormalizedIdentity>,

    /// Client headers already selected for propagation.
    forward_headers: HeaderMap,
}

impl RequestContext {
    /// Build the context for one request.
    ///
    /// Signing keys are resolved FIRST, before the credential is even
    /// inspected, so any traffic triggers the once-only load and an
    /// unreachable issuer fails anonymous requests the same way.
    ///
    /// # Errors
    ///
    /// - `GatewayError::KeyFetch` when the signing keys cannot be loaded
    /// - `GatewayError::MalformedToken` when an Authorization header is
    ///   present but carries no bearer credential
    /// - Any verification or identity error for a present credential
    pub async fn from_headers(
        headers: &HeaderMap,
        key_store: &IssuerKeyStore,
        verifier: &TokenVerifier,
        forward_header_names: &[String],
    ) -> Result<Self, GatewayError> {
        let public_keys = key_store.signing_keys().await?;
        let forward_headers = collect_forward_headers(headers, forward_header_names);

        let Some(authorization) = headers.get("authorization") else {
            tracing::debug!(target: "gw.context", "Anonymous request");
            return Ok(Self {
                raw_token: None,
                public_keys,
                identity: None,
                forward_headers,
            });
        };

        // "Bearer <token>": the credential is the second whitespace-split
        // word
        let raw_token = authorization
            .to_str()
            .ok()
            .and_then(|value| value.split_whitespace().nth(1))
            .ok_or_else(|| {
                tracing::debug!(target: "gw.context", "Authorization header carries no bearer credential");
                GatewayError::MalformedToken
            })?;

        let verified = verifier.verify(raw_token, &public_keys)?;
        let identity = identity::normalize(&verified.decoded.payload, verified.mapping)?;

        tracing::debug!(target: "gw.context", mapping = ?verified.mapping, "Authenticated request");

        Ok(Self {
            raw_token: Some(SecretString::from(raw_token)),
            public_keys,
            identity: Some(identity),
            forward_headers,
        })
    }

    /// The raw bearer token, when the request carried one.
    #[must_use]
    pub fn raw_token(&self) -> Option<&SecretString> {
        self.raw_token.as_ref()
    }

    /// The signing key set this request was checked against.
    #[must_use]
    pub fn public_keys(&self) -> &Arc<SigningKeySet> {
        &self.public_keys
    }

    /// The verified caller identity, `None` for anonymous requests.
    #[must_use]
    pub fn identity(&self) -> Option<&NormalizedIdentity> {
        self.identity.as_ref()
    }

    /// Client headers selected for propagation.
    #[must_use]
    pub fn forward_headers(&self) -> &HeaderMap {
        &self.forward_headers
    }

    /// True when the request carried a verified credential.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("raw_token", &self.raw_token.as_ref().map(|_| "[REDACTED]"))
            .field("identity", &self.identity)
            .field("cached_keys", &self.public_keys.len())
            .field(
                "forward_headers",
                &self.forward_headers.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Select the client headers that forward to subgraphs.
///
/// `x-forwarded-for` is renamed to `origin-client-ip`; the preflight
/// header and the configured pass-through names keep their own names.
/// Absent headers produce no entry. For repeated headers only the first
/// value is taken.
fn collect_forward_headers(headers: &HeaderMap, names: &[String]) -> HeaderMap {
    let mut forward = HeaderMap::new();

    if let Some(value) = extract_header(headers, HEADER_FORWARDED_FOR) {
        forward.insert(HEADER_ORIGIN_CLIENT_IP, value.clone());
    }

    if let Some(value) = extract_header(headers, HEADER_REQUIRE_PREFLIGHT) {
        forward.insert(HEADER_REQUIRE_PREFLIGHT, value.clone());
    }

    for name in names {
        if let Some(value) = extract_header(headers, name) {
            // Config validation restricts names to header-legal characters
            if let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) {
                forward.insert(header_name, value.clone());
            }
        }
    }

    forward
}
