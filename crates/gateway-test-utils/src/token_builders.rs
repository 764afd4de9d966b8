//! Builder patterns for test token claims
//!
//! Provides fluent APIs for creating claim payloads in the shapes the
//! gateway's trusted issuers publish. Builders produce `serde_json::Value`
//! maps ready for [`crate::TestKeypair::sign`].

use chrono::{Duration, Utc};
use serde_json::{json, Value};

/// Builder for corporate SSO token claims.
///
/// Produces the SSO shape: display `name`, a JSON-encoded group list under
/// `custom:groups`, and an external `identities` array.
///
/// # Example
/// ```rust,ignore
/// let claims = SsoClaimsBuilder::new()
///     .named("Ada Lovelace")
///     .with_groups(&["admins", "editors"])
///     .with_username("ad|Corp|ada")
///     .build();
/// ```
pub struct SsoClaimsBuilder {
    iss: Option<String>,
    name: String,
    groups: Vec<String>,
    username: String,
    exp: i64,
    iat: i64,
}

impl SsoClaimsBuilder {
    /// Create a builder with a valid default identity expiring in an hour.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: Some("sso.example.com".to_string()),
            name: "Test User".to_string(),
            groups: vec!["engineering".to_string()],
            username: "ad|Corp|test-user".to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the access groups.
    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(ToString::to_string).collect();
        self
    }

    /// Set the external user identifier (first `identities` entry).
    pub fn with_username(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    /// Set the issuer claim.
    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.iss = Some(iss.to_string());
        self
    }

    /// Drop the issuer claim entirely.
    pub fn without_issuer(mut self) -> Self {
        self.iss = None;
        self
    }

    /// Set expiration in seconds from now (negative for already expired).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp.
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value.
    pub fn build(self) -> Value {
        // The groups claim is a JSON document inside a JSON string
        let groups_json =
            serde_json::to_string(&self.groups).expect("group list serializes to JSON");

        let mut claims = json!({
            "name": self.name,
            "custom:groups": groups_json,
            "identities": [{"userId": self.username, "providerName": "Corp"}],
            "exp": self.exp,
            "iat": self.iat,
        });
        if let Some(iss) = self.iss {
            claims["iss"] = json!(iss);
        }
        claims
    }
}

impl Default for SsoClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for first-party account token claims.
///
/// Produces the native shape: `sub` account id with an `email` alongside.
pub struct NativeClaimsBuilder {
    iss: Option<String>,
    sub: String,
    email: String,
    exp: i64,
    iat: i64,
}

impl NativeClaimsBuilder {
    /// Create a builder with a valid default account expiring in an hour.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: Some("tokens.example.com".to_string()),
            sub: "user-12345".to_string(),
            email: "test-user@example.com".to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the account identifier.
    pub fn for_user(mut self, sub: &str) -> Self {
        self.sub = sub.to_string();
        self
    }

    /// Set the email claim.
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Set the issuer claim.
    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.iss = Some(iss.to_string());
        self
    }

    /// Drop the issuer claim entirely.
    pub fn without_issuer(mut self) -> Self {
        self.iss = None;
        self
    }

    /// Set expiration in seconds from now (negative for already expired).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp.
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value.
    pub fn build(self) -> Value {
        let mut claims = json!({
            "sub": self.sub,
            "email": self.email,
            "exp": self.exp,
            "iat": self.iat,
        });
        if let Some(iss) = self.iss {
            claims["iss"] = json!(iss);
        }
        claims
    }
}

impl Default for NativeClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sso_builder_creates_valid_claims() {
        let claims = SsoClaimsBuilder::new()
            .named("Ada Lovelace")
            .with_groups(&["admins", "editors"])
            .with_username("ad|Corp|ada")
            .build();

        assert_eq!(claims["iss"], "sso.example.com");
        assert_eq!(claims["name"], "Ada Lovelace");
        assert_eq!(claims["custom:groups"], r#"["admins","editors"]"#);
        assert_eq!(claims["identities"][0]["userId"], "ad|Corp|ada");
        assert!(claims["exp"].as_i64().unwrap() > claims["iat"].as_i64().unwrap());
    }

    #[test]
    fn test_sso_builder_without_issuer() {
        let claims = SsoClaimsBuilder::new().without_issuer().build();
        assert!(claims.get("iss").is_none());
    }

    #[test]
    fn test_sso_builder_expired_token() {
        let claims = SsoClaimsBuilder::new().expires_in(-3600).build();
        assert!(claims["exp"].as_i64().unwrap() < Utc::now().timestamp());
    }

    #[test]
    fn test_native_builder_creates_valid_claims() {
        let claims = NativeClaimsBuilder::new()
            .for_user("user-777")
            .with_email("ada@example.com")
            .build();

        assert_eq!(claims["iss"], "tokens.example.com");
        assert_eq!(claims["sub"], "user-777");
        assert_eq!(claims["email"], "ada@example.com");
    }

    #[test]
    fn test_builders_default() {
        assert_eq!(SsoClaimsBuilder::default().build()["name"], "Test User");
        assert_eq!(NativeClaimsBuilder::default().build()["sub"], "user-12345");
    }
}
