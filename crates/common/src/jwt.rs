//! JWT utilities shared across the gateway workspace.
//!
//! This module provides the token plumbing the edge service builds on:
//! - Size limits for DoS prevention
//! - Clock skew constants for iat validation
//! - Structural (unverified) token decoding for key selection
//! - iat validation logic
//! - Ed25519 public key encoding helpers
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Structural decoding never validates a signature; callers MUST verify
//!   the token against a trusted key afterwards
//! - Generic error messages prevent information leakage
//! - Token payloads are redacted in Debug output

use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// This limit prevents denial-of-service attacks via oversized tokens.
/// JWTs larger than this size are rejected BEFORE any parsing or cryptographic
/// operations, providing defense-in-depth against resource exhaustion attacks.
///
/// # Rationale
///
/// - Typical JWTs are 200-500 bytes (header + claims + signature)
/// - SSO tokens with group lists run larger but stay well under 4KB
/// - 8KB allows for reasonable expansion while preventing abuse
/// - Checked BEFORE base64 decode and signature verification for efficiency
///
/// # Attack Scenario
///
/// - Attacker sends a 10MB bearer token to the gateway
/// - Without size limit: base64 decode allocates a large buffer, wastes CPU/memory
/// - With size limit: rejected immediately with minimal resource usage
///
/// Per OWASP API Security Top 10 - API4:2023 (Unrestricted Resource Consumption)
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// This tolerance accounts for clock drift between servers. Tokens with time
/// claims more than this amount out of range are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// This prevents misconfiguration that could weaken security by allowing
/// excessively large clock skew tolerance.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural JWT validation.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Token Types
// =============================================================================

/// JWT header fields the gateway cares about.
///
/// Unknown header fields (`typ`, `cty`, ...) are ignored during
/// deserialization. A missing `alg` makes the token structurally invalid.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    /// Key ID selecting the verification key. Optional; issuers that sign
    /// with a single stable key may omit it.
    #[serde(default)]
    pub kid: Option<String>,

    /// Signature algorithm declared by the token.
    pub alg: String,
}

/// A structurally decoded, UNVERIFIED token.
///
/// Produced by [`decode_unverified`]. Holding one of these proves nothing:
/// the claims are attacker-controlled until the signature is checked against
/// a trusted key. The payload and signature are redacted in Debug output.
#[derive(Clone)]
pub struct DecodedToken {
    /// Decoded JOSE header.
    pub header: TokenHeader,

    /// Decoded claims map. Always a JSON object.
    pub payload: serde_json::Value,

    /// The base64url signature segment, unmodified.
    pub signature: String,
}

impl fmt::Debug for DecodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedToken")
            .field("header", &self.header)
            .field("payload", &"[REDACTED]")
            .field("signature", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a JWT's header and payload without verifying the signature.
///
/// This is used to read the `kid` and issuer claim so the correct signing
/// key can be looked up before verification (e.g., during key rotation or
/// multi-issuer migration windows).
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The token MUST still be verified after fetching the key
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - wrong segment count, bad base64, invalid JSON,
///   payload not a JSON object, or a header without an `alg`
pub fn decode_unverified(token: &str) -> Result<DecodedToken, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let payload_part = parts.get(1).ok_or(JwtValidationError::MalformedToken)?;
    let signature_part = parts.get(2).ok_or(JwtValidationError::MalformedToken)?;

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: TokenHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT payload base64");
        JwtValidationError::MalformedToken
    })?;

    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT payload JSON");
        JwtValidationError::MalformedToken
    })?;

    // Claims must be a map; "null" and bare scalars are legal JSON but not
    // legal JWT claim sets
    if !payload.is_object() {
        tracing::debug!(target: "common.jwt", "Token rejected: payload is not a JSON object");
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(DecodedToken {
        header,
        payload,
        signature: (*signature_part).to_string(),
    })
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens with `iat` too far in the future, which could indicate:
/// - Token pre-generation attack
/// - Clock synchronization issues
/// - Token manipulation
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is
/// more than `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
///
/// Prefer [`validate_iat`] in production code. This variant exists so that
/// boundary conditions can be unit-tested without wall-clock dependence.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds), well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Encode a raw Ed25519 public key as a PEM `PUBLIC KEY` block.
///
/// Wraps the 32-byte key in the fixed SubjectPublicKeyInfo envelope for
/// Ed25519 (RFC 8410) and base64-encodes the result. The output is accepted
/// by `jsonwebtoken::DecodingKey::from_ed_pem`.
///
/// The fixed-size parameter makes wrong-length key material unrepresentable;
/// callers convert fetched bytes with `try_into` and surface their own error
/// when an issuer publishes garbage.
#[must_use]
pub fn encode_ed25519_public_key_pem(public_key: &[u8; 32]) -> String {
    // SPKI header for id-Ed25519: SEQUENCE { AlgorithmIdentifier, BIT STRING }
    const ED25519_SPKI_PREFIX: [u8; 12] = [
        0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
    ];

    let mut der = Vec::with_capacity(ED25519_SPKI_PREFIX.len() + public_key.len());
    der.extend_from_slice(&ED25519_SPKI_PREFIX);
    der.extend_from_slice(public_key);

    let b64 = STANDARD.encode(der);

    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
    for chunk in b64.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----\n");
    pem
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url format).
///
/// The `x` field in an OKP (Octet Key Pair) JWK contains the public key
/// in base64url encoding without padding.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64url content cannot be decoded.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================
