//! Edge gateway error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse`
//! impl, with a GraphQL-shaped body (`errors[].message` +
//! `errors[].extensions.code`) so GraphQL clients surface them natively.
//! Messages for authentication failures are fixed per kind; operational
//! detail stays in server-side logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::JwtValidationError;
use serde::Serialize;
use thiserror::Error;

/// Edge gateway error type.
///
/// Maps to appropriate HTTP status codes:
/// - MalformedToken, NoIssuer, UnknownKey, InvalidSignature, Expired,
///   NotYetValid, MissingIdentity: 401 Unauthorized
/// - KeyFetch, SubgraphUnavailable: 503 Service Unavailable
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The bearer credential is not a decodable JWT.
    #[error("Could not decode JWT")]
    MalformedToken,

    /// The decoded payload carries no issuer claim.
    #[error("The JWT has no issuer defined, unable to verify")]
    NoIssuer,

    /// Neither the header kid nor the configured default resolves to a
    /// cached signing key. The field is the kid that failed to resolve,
    /// for logging.
    #[error("No signing key matches the token's key id")]
    UnknownKey(String),

    /// Signature or claim verification failed. The field is a stable
    /// category string shown to the client after the fixed prefix.
    #[error("Could not validate User: {0}")]
    InvalidSignature(String),

    /// The token's expiry has passed.
    #[error("Token Expired")]
    Expired,

    /// The token is not valid yet (nbf or iat in the future).
    #[error("Token not yet active")]
    NotYetValid,

    /// A verified token is missing the claims its issuer contract
    /// requires for identity derivation.
    #[error("{0}")]
    MissingIdentity(String),

    /// An issuer key set could not be loaded. The field is the internal
    /// detail, logged but never shown to clients.
    #[error("Unable to get the public key from the issuer to verify the JWT")]
    KeyFetch(String),

    /// A downstream subgraph could not be reached.
    #[error("Subgraph unavailable: {0}")]
    SubgraphUnavailable(String),

    /// Unexpected failure. Logged and reported before construction.
    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::MalformedToken
            | GatewayError::NoIssuer
            | GatewayError::UnknownKey(_)
            | GatewayError::InvalidSignature(_)
            | GatewayError::Expired
            | GatewayError::NotYetValid
            | GatewayError::MissingIdentity(_) => 401,
            GatewayError::KeyFetch(_) | GatewayError::SubgraphUnavailable(_) => 503,
            GatewayError::Internal => 500,
        }
    }

    /// Stable snake_case label for metrics, one per kind.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            GatewayError::MalformedToken => "malformed_token",
            GatewayError::NoIssuer => "no_issuer",
            GatewayError::UnknownKey(_) => "unknown_key",
            GatewayError::InvalidSignature(_) => "invalid_signature",
            GatewayError::Expired => "expired",
            GatewayError::NotYetValid => "not_yet_valid",
            GatewayError::MissingIdentity(_) => "missing_identity",
            GatewayError::KeyFetch(_) => "key_fetch",
            GatewayError::SubgraphUnavailable(_) => "subgraph_unavailable",
            GatewayError::Internal => "internal",
        }
    }
}

#[derive(Serialize)]
struct GraphqlErrorResponse {
    errors: Vec<GraphqlError>,
}

#[derive(Serialize)]
struct GraphqlError {
    message: String,
    extensions: GraphqlErrorExtensions,
}

#[derive(Serialize)]
struct GraphqlErrorExtensions {
    code: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::MalformedToken
            | GatewayError::NoIssuer
            | GatewayError::InvalidSignature(_)
            | GatewayError::Expired
            | GatewayError::NotYetValid
            | GatewayError::MissingIdentity(_) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", self.to_string())
            }
            GatewayError::UnknownKey(kid) => {
                // The kid is logged server-side but kept out of the client
                // message
                tracing::debug!(target: "gw.auth.jwt", kid = %kid, "No signing key for token kid");
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", self.to_string())
            }
            GatewayError::KeyFetch(detail) => {
                // Log actual failure server-side, return fixed message to client
                tracing::warn!(target: "gw.auth.jwks", detail = %detail, "Signing key load failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "KEY_FETCH_FAILED",
                    self.to_string(),
                )
            }
            GatewayError::SubgraphUnavailable(detail) => {
                // Log actual reason server-side
                tracing::warn!(target: "gw.proxy", detail = %detail, "Subgraph unreachable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SUBGRAPH_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let error_response = GraphqlErrorResponse {
            errors: vec![GraphqlError {
                message,
                extensions: GraphqlErrorExtensions {
                    code: code.to_string(),
                },
            }],
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"edge-gateway\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Structural token failures become the decode-level taxonomy entries.
impl From<JwtValidationError> for GatewayError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                GatewayError::MalformedToken
            }
            JwtValidationError::IatTooFarInFuture => GatewayError::NotYetValid,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_malformed_token() {
        let error = GatewayError::MalformedToken;
        assert_eq!(format!("{}", error), "Could not decode JWT");
    }

    #[test]
    fn test_display_no_issuer() {
        let error = GatewayError::NoIssuer;
        assert_eq!(
            format!("{}", error),
            "The JWT has no issuer defined, unable to verify"
        );
    }

    #[test]
    fn test_display_unknown_key_hides_kid() {
        let error = GatewayError::UnknownKey("PK99X".to_string());
        let display = format!("{}", error);
        assert_eq!(display, "No signing key matches the token's key id");
        assert!(!display.contains("PK99X"));
    }

    #[test]
    fn test_display_invalid_signature_includes_category() {
        let error = GatewayError::InvalidSignature("invalid signature".to_string());
        assert_eq!(
            format!("{}", error),
            "Could not validate User: invalid signature"
        );
    }

    #[test]
    fn test_display_expired() {
        let error = GatewayError::Expired;
        assert_eq!(format!("{}", error), "Token Expired");
    }

    #[test]
    fn test_display_not_yet_valid() {
        let error = GatewayError::NotYetValid;
        assert_eq!(format!("{}", error), "Token not yet active");
    }

    #[test]
    fn test_display_missing_identity_is_verbatim() {
        let error =
            GatewayError::MissingIdentity("JWT payload missing identity information".to_string());
        assert_eq!(
            format!("{}", error),
            "JWT payload missing identity information"
        );
    }

    #[test]
    fn test_display_key_fetch_hides_detail() {
        let error = GatewayError::KeyFetch("connection refused to sso.example.com".to_string());
        let display = format!("{}", error);
        assert_eq!(
            display,
            "Unable to get the public key from the issuer to verify the JWT"
        );
        assert!(!display.contains("sso.example.com"));
    }

    #[test]
    fn test_display_internal() {
        let error = GatewayError::Internal;
        assert_eq!(format!("{}", error), "Internal server error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::MalformedToken.status_code(), 401);
        assert_eq!(GatewayError::NoIssuer.status_code(), 401);
        assert_eq!(GatewayError::UnknownKey("k".to_string()).status_code(), 401);
        assert_eq!(
            GatewayError::InvalidSignature("x".to_string()).status_code(),
            401
        );
        assert_eq!(GatewayError::Expired.status_code(), 401);
        assert_eq!(GatewayError::NotYetValid.status_code(), 401);
        assert_eq!(
            GatewayError::MissingIdentity("m".to_string()).status_code(),
            401
        );
        assert_eq!(GatewayError::KeyFetch("k".to_string()).status_code(), 503);
        assert_eq!(
            GatewayError::SubgraphUnavailable("s".to_string()).status_code(),
            503
        );
        assert_eq!(GatewayError::Internal.status_code(), 500);
    }

    #[test]
    fn test_outcome_labels_are_distinct() {
        let errors = [
            GatewayError::MalformedToken,
            GatewayError::NoIssuer,
            GatewayError::UnknownKey(String::new()),
            GatewayError::InvalidSignature(String::new()),
            GatewayError::Expired,
            GatewayError::NotYetValid,
            GatewayError::MissingIdentity(String::new()),
            GatewayError::KeyFetch(String::new()),
            GatewayError::SubgraphUnavailable(String::new()),
            GatewayError::Internal,
        ];

        let labels: Vec<&str> = errors.iter().map(GatewayError::outcome_label).collect();
        let mut deduped = labels.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(labels.len(), deduped.len());
    }

    #[tokio::test]
    async fn test_into_response_expired_token() {
        let error = GatewayError::Expired;
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Check WWW-Authenticate header
        let www_auth = response.headers().get("WWW-Authenticate");
        assert!(www_auth.is_some());
        let www_auth_str = www_auth.unwrap().to_str().unwrap();
        assert!(www_auth_str.contains("Bearer realm=\"edge-gateway\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["errors"][0]["message"], "Token Expired");
        assert_eq!(
            body_json["errors"][0]["extensions"]["code"],
            "UNAUTHENTICATED"
        );
    }

    #[tokio::test]
    async fn test_into_response_no_issuer() {
        let error = GatewayError::NoIssuer;
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(
            body_json["errors"][0]["message"],
            "The JWT has no issuer defined, unable to verify"
        );
    }

    #[tokio::test]
    async fn test_into_response_unknown_key() {
        let error = GatewayError::UnknownKey("PK99X".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(
            body_json["errors"][0]["message"],
            "No signing key matches the token's key id"
        );
        // The kid never reaches the client
        assert!(!body_json.to_string().contains("PK99X"));
    }

    #[tokio::test]
    async fn test_into_response_key_fetch() {
        let error = GatewayError::KeyFetch("dns lookup failed".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        // No WWW-Authenticate on 503
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(
            body_json["errors"][0]["message"],
            "Unable to get the public key from the issuer to verify the JWT"
        );
        assert_eq!(
            body_json["errors"][0]["extensions"]["code"],
            "KEY_FETCH_FAILED"
        );
    }

    #[tokio::test]
    async fn test_into_response_subgraph_unavailable() {
        let error = GatewayError::SubgraphUnavailable("connection refused".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_json = read_body_json(response.into_body()).await;
        // Generic message returned to client
        assert_eq!(
            body_json["errors"][0]["message"],
            "Service temporarily unavailable"
        );
        assert_eq!(
            body_json["errors"][0]["extensions"]["code"],
            "SUBGRAPH_UNAVAILABLE"
        );
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let error = GatewayError::Internal;
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["errors"][0]["message"], "Internal server error");
        assert_eq!(
            body_json["errors"][0]["extensions"]["code"],
            "INTERNAL_SERVER_ERROR"
        );
    }

    #[test]
    fn test_from_jwt_validation_error() {
        assert!(matches!(
            GatewayError::from(JwtValidationError::TokenTooLarge),
            GatewayError::MalformedToken
        ));
        assert!(matches!(
            GatewayError::from(JwtValidationError::MalformedToken),
            GatewayError::MalformedToken
        ));
        assert!(matches!(
            GatewayError::from(JwtValidationError::IatTooFarInFuture),
            GatewayError::NotYetValid
        ));
    }
}
