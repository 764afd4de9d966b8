//! Header propagation to subgraphs.
//!
//! Subgraphs never see the inbound request directly; they see a header set
//! stamped from the request context. The raw bearer token travels in the
//! `jwt` header, the normalized identity in mapping-specific headers, and
//! configured client headers verbatim.

use crate::auth::NormalizedIdentity;
use crate::errors::GatewayError;
use axum::http::{HeaderMap, HeaderValue};
use common::secret::{ExposeSecret, SecretString};

/// Outbound header carrying the raw bearer token.
pub const HEADER_JWT: &str = "jwt";

/// Outbound headers stamped from an SSO identity.
pub const HEADER_NAME: &str = "name";
pub const HEADER_GROUPS: &str = "groups";
pub const HEADER_USERNAME: &str = "username";

/// Outbound headers stamped from a native identity.
pub const HEADER_USER_ID: &str = "userid";
pub const HEADER_EMAIL: &str = "email";

/// Outbound header carrying the client address.
pub const HEADER_ORIGIN_CLIENT_IP: &str = "origin-client-ip";

/// Inbound header the client address is read from.
pub const HEADER_FORWARDED_FOR: &str = "x-forwarded-for";

/// CSRF-prevention header forwarded verbatim when present.
pub const HEADER_REQUIRE_PREFLIGHT: &str = "apollo-require-preflight";

/// First value of a request header.
///
/// Clients may repeat a header; only the first occurrence is propagated,
/// the rest are ignored.
pub fn extract_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a HeaderValue> {
    headers.get_all(name).iter().next()
}

/// Build the outbound header set for a subgraph request.
///
/// Starts from the already-collected forward headers and adds the raw
/// token plus identity headers when the request is authenticated. The
/// token leaves its secret wrapper here and nowhere else.
///
/// # Errors
///
/// Returns `GatewayError::Internal` when a claim value cannot be encoded
/// as a header value. The offending header name is logged; the value is
/// not.
pub fn stamp_subgraph_headers(
    raw_token: Option<&SecretString>,
    identity: Option<&NormalizedIdentity>,
    forward_headers: &HeaderMap,
) -> Result<HeaderMap, GatewayError> {
    let mut headers = forward_headers.clone();

    if let Some(token) = raw_token {
        headers.insert(HEADER_JWT, header_value(HEADER_JWT, token.expose_secret())?);
    }

    match identity {
        Some(NormalizedIdentity::Sso(sso)) => {
            headers.insert(HEADER_NAME, header_value(HEADER_NAME, &sso.name)?);
            headers.insert(
                HEADER_GROUPS,
                header_value(HEADER_GROUPS, &sso.groups.join(","))?,
            );
            headers.insert(HEADER_USERNAME, header_value(HEADER_USERNAME, &sso.username)?);
        }
        Some(NormalizedIdentity::Native(native)) => {
            headers.insert(HEADER_USER_ID, header_value(HEADER_USER_ID, &native.user_id)?);
            headers.insert(HEADER_EMAIL, header_value(HEADER_EMAIL, &native.email)?);
        }
        None => {}
    }

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(value).map_err(|e| {
        tracing::error!(target: "gw.proxy", header = %name, error = %e, "Value cannot be sent as a header");
        GatewayError::Internal
    })
}
