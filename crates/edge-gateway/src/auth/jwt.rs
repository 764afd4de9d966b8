//! JWT verification for the gateway edge.
//!
//! Verifies bearer tokens against the cached signing key set and maps
//! every failure to one entry of the client-facing error taxonomy.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only EdDSA (Ed25519) algorithm is accepted
//! - A token that names a kid is checked against that key only; no
//!   cross-key fallback
//! - Expiration, not-before, and issued-at claims are validated with
//!   clock skew tolerance
//! - Verification failure detail is reduced to a stable category string
//!   before it reaches the client

use crate::auth::claims::ClaimsMapping;
use crate::auth::jwks::{SigningKeyEntry, SigningKeySet};
use crate::errors::GatewayError;
use crate::services::error_reporter::ErrorReporter;
use common::jwt::{decode_unverified, validate_iat, DecodedToken};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Outcome of a successful verification.
#[derive(Debug)]
pub struct VerifiedToken {
    /// Decoded header and verified payload.
    pub decoded: DecodedToken,

    /// Claims mapping of the issuer that owns the signing key.
    pub mapping: ClaimsMapping,
}

/// Token verifier bound to the gateway's verification policy.
pub struct TokenVerifier {
    /// Kid used for tokens whose header carries none.
    default_kid: Option<String>,

    /// Clock skew tolerance for exp, nbf, and iat validation.
    clock_skew: Duration,

    /// Sink for failures that indicate a gateway bug rather than a bad
    /// token.
    reporter: Arc<dyn ErrorReporter>,
}

impl TokenVerifier {
    /// Create a new token verifier.
    ///
    /// # Arguments
    ///
    /// * `default_kid` - Kid assumed for tokens without one in the header
    /// * `clock_skew_seconds` - Clock skew tolerance in seconds
    /// * `reporter` - Sink for unexpected verification failures
    pub fn new(
        default_kid: Option<String>,
        clock_skew_seconds: i64,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        // Config validation bounds the skew to 0..=600 seconds
        let clock_skew = Duration::from_secs(clock_skew_seconds.max(0) as u64);
        Self {
            default_kid,
            clock_skew,
            reporter,
        }
    }

    /// Verify a bearer token against the cached signing key set.
    ///
    /// # Verification Steps
    ///
    /// 1. Size check and structural decode - reject tokens > 8KB before
    ///    parsing
    /// 2. Issuer presence check - the payload must claim an issuer; the
    ///    value itself is not compared, key possession is the trust anchor
    /// 3. Key resolution - header kid, or the configured default for
    ///    kid-less tokens
    /// 4. EdDSA signature verification with exp and nbf validation
    /// 5. iat hardening with clock skew tolerance
    ///
    /// # Errors
    ///
    /// Returns the taxonomy entry for the first failed step. Unexpected
    /// library failures are reported and become `GatewayError::Internal`.
    #[instrument(skip_all)]
    pub fn verify(
        &self,
        token: &str,
        keys: &SigningKeySet,
    ) -> Result<VerifiedToken, GatewayError> {
        // 1. Structural decode (includes size check)
        let decoded = decode_unverified(token).map_err(|e| {
            tracing::debug!(target: "gw.auth.jwt", error = ?e, "Token decode failed");
            GatewayError::from(e)
        })?;

        // 2. Issuer must be present and non-empty
        let has_issuer = decoded
            .payload
            .get("iss")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|iss| !iss.is_empty());
        if !has_issuer {
            tracing::debug!(target: "gw.auth.jwt", "Token carries no issuer claim");
            return Err(GatewayError::NoIssuer);
        }

        // 3. Resolve the signing key
        let entry = self.resolve_key(decoded.header.kid.as_deref(), keys)?;

        // 4. Verify signature and registered time claims
        let decoding_key = DecodingKey::from_ed_pem(entry.pem.as_bytes()).map_err(|e| {
            tracing::error!(target: "gw.auth.jwt", kid = %entry.kid, error = %e, "Cached key is not usable for verification");
            self.reporter.report(&e);
            GatewayError::Internal
        })?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        // exp stays required (the default); nbf is honored when present
        validation.validate_nbf = true;
        // Audience is not part of the verification contract
        validation.validate_aud = false;
        validation.leeway = self.clock_skew.as_secs();

        let verified = decode::<serde_json::Value>(token, &decoding_key, &validation)
            .map_err(|e| self.map_verification_error(e))?;

        // 5. Harden against future-dated iat, which signature checks alone
        // do not catch
        if let Some(iat) = verified.claims.get("iat").and_then(serde_json::Value::as_i64) {
            if let Err(e) = validate_iat(iat, self.clock_skew) {
                tracing::debug!(target: "gw.auth.jwt", error = ?e, "Token iat validation failed");
                return Err(GatewayError::NotYetValid);
            }
        }

        tracing::debug!(target: "gw.auth.jwt", kid = %entry.kid, "Token verified");

        Ok(VerifiedToken {
            decoded: DecodedToken {
                header: decoded.header,
                payload: verified.claims,
                signature: decoded.signature,
            },
            mapping: entry.mapping,
        })
    }

    /// Resolve the signing key for a token.
    ///
    /// A header kid is authoritative: only that key is consulted. Tokens
    /// without a kid fall back to the configured default, when one exists.
    fn resolve_key<'a>(
        &self,
        header_kid: Option<&str>,
        keys: &'a SigningKeySet,
    ) -> Result<&'a SigningKeyEntry, GatewayError> {
        match header_kid {
            Some(kid) => keys
                .get(kid)
                .ok_or_else(|| GatewayError::UnknownKey(kid.to_string())),
            None => {
                let kid = self.default_kid.as_deref().ok_or_else(|| {
                    tracing::debug!(target: "gw.auth.jwt", "Token has no kid and no default kid is configured");
                    GatewayError::UnknownKey("(none)".to_string())
                })?;
                keys.get(kid)
                    .ok_or_else(|| GatewayError::UnknownKey(kid.to_string()))
            }
        }
    }

    /// Map a verification failure to its taxonomy entry.
    ///
    /// Known kinds become stable categories a client may see after the
    /// fixed prefix. Anything else is a gateway-side surprise: it is
    /// reported and collapsed to `Internal`.
    fn map_verification_error(&self, err: jsonwebtoken::errors::Error) -> GatewayError {
        tracing::debug!(target: "gw.auth.jwt", error = %err, "Token verification failed");

        match err.kind() {
            ErrorKind::ExpiredSignature => GatewayError::Expired,
            ErrorKind::ImmatureSignature => GatewayError::NotYetValid,
            ErrorKind::InvalidSignature => {
                GatewayError::InvalidSignature("invalid signature".to_string())
            }
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => GatewayError::InvalidSignature("invalid token".to_string()),
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                GatewayError::InvalidSignature("algorithm mismatch".to_string())
            }
            ErrorKind::MissingRequiredClaim(_) => {
                GatewayError::InvalidSignature("missing required claim".to_string())
            }
            kind => {
                tracing::error!(target: "gw.auth.jwt", kind = ?kind, "Unexpected verification error");
                self.reporter.report(&err);
                GatewayError::Internal
            }
        }
    }
}
