//! Claims-to-identity normalization.
//!
//! Pure functions from a verified claims map to a [`NormalizedIdentity`].
//! No network or cache access happens here; the caller has already picked
//! the mapping via the key that verified the token.

use crate::auth::claims::{ClaimsMapping, NativeIdentity, NormalizedIdentity, SsoIdentity};
use crate::errors::GatewayError;
use serde_json::Value;

/// Message for tokens whose identity-bearing claims are absent or empty.
const MISSING_IDENTITY: &str = "JWT payload missing identity information";

/// Message for SSO tokens whose group claim cannot be parsed.
const INVALID_GROUPS: &str = "JWT payload groups claim is not a valid JSON array";

/// Derive a normalized identity from a verified claims map.
///
/// # Errors
///
/// Returns `GatewayError::MissingIdentity` when the claim structure the
/// issuer contract requires is absent. Failures are total for the request;
/// no partial identity is ever produced.
pub fn normalize(payload: &Value, mapping: ClaimsMapping) -> Result<NormalizedIdentity, GatewayError> {
    match mapping {
        ClaimsMapping::Sso => normalize_sso(payload),
        ClaimsMapping::Native => normalize_native(payload),
    }
}

/// SSO tokens: `name`, a JSON-encoded string array under `custom:groups`,
/// and the external id array under `identities`.
fn normalize_sso(payload: &Value) -> Result<NormalizedIdentity, GatewayError> {
    // The groups claim is a JSON document inside a JSON string. A missing
    // or unparseable claim is fatal, never an empty group list.
    let groups_raw = payload
        .get("custom:groups")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            tracing::debug!(target: "gw.auth.identity", "SSO token groups claim missing or not a string");
            GatewayError::MissingIdentity(INVALID_GROUPS.to_string())
        })?;

    let groups: Vec<String> = serde_json::from_str(groups_raw).map_err(|e| {
        tracing::debug!(target: "gw.auth.identity", error = %e, "SSO token groups claim failed to parse");
        GatewayError::MissingIdentity(INVALID_GROUPS.to_string())
    })?;

    // The stable external identity is the first entry of the identities
    // array; an empty array means the token cannot identify anyone
    let username = payload
        .get("identities")
        .and_then(Value::as_array)
        .and_then(|identities| identities.first())
        .and_then(|identity| identity.get("userId"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "gw.auth.identity", "SSO token has no usable identities entry");
            GatewayError::MissingIdentity(MISSING_IDENTITY.to_string())
        })?;

    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(NormalizedIdentity::Sso(SsoIdentity {
        name: name.to_string(),
        groups,
        username: username.to_string(),
    }))
}

/// First-party tokens: `sub` is the account id, `email` travels alongside.
fn normalize_native(payload: &Value) -> Result<NormalizedIdentity, GatewayError> {
    let user_id = payload
        .get("sub")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "gw.auth.identity", "Native token has no usable sub claim");
            GatewayError::MissingIdentity(MISSING_IDENTITY.to_string())
        })?;

    let email = payload
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(NormalizedIdentity::Native(NativeIdentity {
        user_id: user_id.to_string(),
        email: email.to_string(),
    }))
}
