//! Edge gateway configuration.
//!
//! Configuration is loaded from environment variables. Trusted issuers and
//! downstream subgraphs are supplied as JSON arrays so a migration window
//! can add an issuer without a code change.

use crate::auth::ClaimsMapping;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default inbound body size limit in bytes (file uploads included).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10_000_000;

/// Forward headers copied verbatim from the originating edge when present.
pub const DEFAULT_FORWARD_HEADERS: &[&str] = &[
    "web-request-user-agent",
    "web-request-ip-address",
    "web-request-snowplow-domain-user-id",
    "web-request-language",
];

/// Default gateway instance ID prefix.
pub const DEFAULT_GATEWAY_ID_PREFIX: &str = "gw";

/// A trusted token issuer.
///
/// `key_ids` is ordered; the gateway retains only these kids from the
/// issuer's published key set, in this order.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuerConfig {
    /// Issuer hostname (e.g., "sso.example.com"). A scheme may be included
    /// for non-TLS local development; https is assumed otherwise.
    pub host: String,

    /// Well-known discovery path (e.g., "/.well-known/jwks.json").
    pub jwks_path: String,

    /// Key IDs accepted from this issuer, in precedence order.
    pub key_ids: Vec<String>,

    /// Claims mapping selecting how this issuer's tokens become identities.
    pub claims: ClaimsMapping,
}

impl IssuerConfig {
    /// Full discovery URL for this issuer's key set.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        if self.host.contains("://") {
            format!("{}{}", self.host, self.jwks_path)
        } else {
            format!("https://{}{}", self.host, self.jwks_path)
        }
    }
}

/// A downstream subgraph endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SubgraphConfig {
    /// Short name used in logs and metrics labels.
    pub name: String,

    /// Full URL operations are POSTed to.
    pub url: String,
}

/// Edge gateway configuration.
///
/// Loaded from environment variables with sensible defaults. Issuer and
/// subgraph lists are required; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:4000").
    pub bind_address: String,

    /// Trusted issuers, in precedence order. Key sets are concatenated in
    /// this order when the signing-key cache is built.
    pub issuers: Vec<IssuerConfig>,

    /// Key ID used when a token header carries none.
    pub default_kid: Option<String>,

    /// Downstream subgraphs. The first entry receives inbound operations.
    pub subgraphs: Vec<SubgraphConfig>,

    /// JWT clock skew tolerance in seconds for token validation.
    pub jwt_clock_skew_seconds: i64,

    /// Inbound body size limit in bytes.
    pub upload_max_bytes: usize,

    /// Extra forward-header names copied verbatim when present, lowercased.
    pub forward_header_names: Vec<String>,

    /// Unique identifier for this gateway instance.
    /// Used for log correlation across replicas.
    pub gateway_id: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid issuer configuration: {0}")]
    InvalidIssuers(String),

    #[error("Invalid default kid configuration: {0}")]
    InvalidDefaultKid(String),

    #[error("Invalid subgraph configuration: {0}")]
    InvalidSubgraphs(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid upload limit configuration: {0}")]
    InvalidUploadLimit(String),

    #[error("Invalid forward header configuration: {0}")]
    InvalidForwardHeaders(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:4000".to_string());

        // Parse and validate the issuer list
        let issuers_json = vars
            .get("GATEWAY_ISSUERS")
            .ok_or_else(|| ConfigError::MissingEnvVar("GATEWAY_ISSUERS".to_string()))?;

        let issuers: Vec<IssuerConfig> = serde_json::from_str(issuers_json).map_err(|e| {
            ConfigError::InvalidIssuers(format!("GATEWAY_ISSUERS must be a JSON array: {e}"))
        })?;

        if issuers.is_empty() {
            return Err(ConfigError::InvalidIssuers(
                "GATEWAY_ISSUERS must contain at least one issuer".to_string(),
            ));
        }

        let mut seen_kids: Vec<&str> = Vec::new();
        for issuer in &issuers {
            if issuer.host.trim().is_empty() {
                return Err(ConfigError::InvalidIssuers(
                    "issuer host must not be empty".to_string(),
                ));
            }

            if !issuer.jwks_path.starts_with('/') {
                return Err(ConfigError::InvalidIssuers(format!(
                    "issuer {} jwks_path must start with '/', got '{}'",
                    issuer.host, issuer.jwks_path
                )));
            }

            if issuer.key_ids.is_empty() {
                return Err(ConfigError::InvalidIssuers(format!(
                    "issuer {} must list at least one key id",
                    issuer.host
                )));
            }

            for kid in &issuer.key_ids {
                if kid.is_empty() {
                    return Err(ConfigError::InvalidIssuers(format!(
                        "issuer {} lists an empty key id",
                        issuer.host
                    )));
                }

                // Duplicate kids across issuers would make key selection
                // ambiguous
                if seen_kids.contains(&kid.as_str()) {
                    return Err(ConfigError::InvalidIssuers(format!(
                        "key id '{kid}' is listed by more than one issuer"
                    )));
                }
                seen_kids.push(kid);
            }
        }

        // Optional fallback kid for tokens whose header carries none
        let default_kid = match vars.get("DEFAULT_KID") {
            Some(value) if value.is_empty() => {
                return Err(ConfigError::InvalidDefaultKid(
                    "DEFAULT_KID must not be empty when set".to_string(),
                ));
            }
            Some(value) => Some(value.clone()),
            None => None,
        };

        // Parse and validate the subgraph list
        let subgraphs_json = vars
            .get("SUBGRAPHS")
            .ok_or_else(|| ConfigError::MissingEnvVar("SUBGRAPHS".to_string()))?;

        let subgraphs: Vec<SubgraphConfig> = serde_json::from_str(subgraphs_json).map_err(|e| {
            ConfigError::InvalidSubgraphs(format!("SUBGRAPHS must be a JSON array: {e}"))
        })?;

        if subgraphs.is_empty() {
            return Err(ConfigError::InvalidSubgraphs(
                "SUBGRAPHS must contain at least one subgraph".to_string(),
            ));
        }

        for subgraph in &subgraphs {
            if subgraph.name.trim().is_empty() {
                return Err(ConfigError::InvalidSubgraphs(
                    "subgraph name must not be empty".to_string(),
                ));
            }

            if !subgraph.url.starts_with("http://") && !subgraph.url.starts_with("https://") {
                return Err(ConfigError::InvalidSubgraphs(format!(
                    "subgraph {} url must be http(s), got '{}'",
                    subgraph.name, subgraph.url
                )));
            }
        }

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{value_str}': {e}"
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {value}"
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        // Parse upload limit with validation
        let upload_max_bytes = if let Some(value_str) = vars.get("UPLOAD_MAX_BYTES") {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidUploadLimit(format!(
                    "UPLOAD_MAX_BYTES must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidUploadLimit(
                    "UPLOAD_MAX_BYTES must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_UPLOAD_MAX_BYTES
        };

        // Parse extra forward-header names
        let forward_header_names = if let Some(value_str) = vars.get("FORWARD_HEADERS") {
            let names: Vec<String> = value_str
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();

            for name in &names {
                if !name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                {
                    return Err(ConfigError::InvalidForwardHeaders(format!(
                        "'{name}' is not a valid header name"
                    )));
                }
            }

            names
        } else {
            DEFAULT_FORWARD_HEADERS
                .iter()
                .map(ToString::to_string)
                .collect()
        };

        // Generate gateway instance ID
        let gateway_id = vars.get("GATEWAY_ID").cloned().unwrap_or_else(|| {
            // Generate a unique ID based on hostname and UUID suffix
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            // Use first 8 chars of UUID for uniqueness
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_GATEWAY_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            bind_address,
            issuers,
            default_kid,
            subgraphs,
            jwt_clock_skew_seconds,
            upload_max_bytes,
            forward_header_names,
            gateway_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "GATEWAY_ISSUERS".to_string(),
                r#"[{"host":"sso.example.com","jwks_path":"/.well-known/jwks.json","key_ids":["SSOKEY1","SSOKEY2"],"claims":"sso"}]"#
                    .to_string(),
            ),
            (
                "SUBGRAPHS".to_string(),
                r#"[{"name":"graph","url":"http://localhost:4001/graphql"}]"#.to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let vars = base_vars();

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "0.0.0.0:4000");
        assert_eq!(config.issuers.len(), 1);
        let issuer = config.issuers.first().unwrap();
        assert_eq!(issuer.host, "sso.example.com");
        assert_eq!(issuer.jwks_path, "/.well-known/jwks.json");
        assert_eq!(issuer.key_ids, vec!["SSOKEY1", "SSOKEY2"]);
        assert_eq!(issuer.claims, ClaimsMapping::Sso);
        assert!(config.default_kid.is_none());
        assert_eq!(config.subgraphs.len(), 1);
        assert_eq!(
            config.jwt_clock_skew_seconds,
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        );
        assert_eq!(config.upload_max_bytes, DEFAULT_UPLOAD_MAX_BYTES);
        assert_eq!(config.forward_header_names, DEFAULT_FORWARD_HEADERS);
        // Gateway ID should be auto-generated
        assert!(config.gateway_id.starts_with("gw-"));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("DEFAULT_KID".to_string(), "PK11T".to_string());
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "120".to_string());
        vars.insert("UPLOAD_MAX_BYTES".to_string(), "5000000".to_string());
        vars.insert(
            "FORWARD_HEADERS".to_string(),
            "origin-trace-id, Web-Request-Language".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.default_kid.as_deref(), Some("PK11T"));
        assert_eq!(config.jwt_clock_skew_seconds, 120);
        assert_eq!(config.upload_max_bytes, 5_000_000);
        // Names are lowercased
        assert_eq!(
            config.forward_header_names,
            vec!["origin-trace-id", "web-request-language"]
        );
    }

    #[test]
    fn test_multiple_issuers_with_mixed_mappings() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_ISSUERS".to_string(),
            r#"[
                {"host":"sso.example.com","jwks_path":"/.well-known/jwks.json","key_ids":["A1"],"claims":"sso"},
                {"host":"tokens.example.com","jwks_path":"/.well-known/jwk","key_ids":["N1","N2"],"claims":"native"}
            ]"#
            .to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.issuers.len(), 2);
        assert_eq!(config.issuers.get(1).unwrap().claims, ClaimsMapping::Native);
    }

    #[test]
    fn test_gateway_id_custom_value() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_ID".to_string(), "gw-custom-001".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.gateway_id, "gw-custom-001");
    }

    #[test]
    fn test_missing_issuers() {
        let mut vars = base_vars();
        vars.remove("GATEWAY_ISSUERS");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "GATEWAY_ISSUERS"));
    }

    #[test]
    fn test_issuers_rejects_invalid_json() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_ISSUERS".to_string(), "not json".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidIssuers(msg)) if msg.contains("JSON array"))
        );
    }

    #[test]
    fn test_issuers_rejects_empty_array() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_ISSUERS".to_string(), "[]".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidIssuers(msg)) if msg.contains("at least one issuer"))
        );
    }

    #[test]
    fn test_issuers_rejects_empty_host() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_ISSUERS".to_string(),
            r#"[{"host":"  ","jwks_path":"/jwks","key_ids":["A"],"claims":"sso"}]"#.to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidIssuers(msg)) if msg.contains("host must not be empty"))
        );
    }

    #[test]
    fn test_issuers_rejects_relative_jwks_path() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_ISSUERS".to_string(),
            r#"[{"host":"sso.example.com","jwks_path":"jwks.json","key_ids":["A"],"claims":"sso"}]"#
                .to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidIssuers(msg)) if msg.contains("must start with '/'"))
        );
    }

    #[test]
    fn test_issuers_rejects_empty_key_id_list() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_ISSUERS".to_string(),
            r#"[{"host":"sso.example.com","jwks_path":"/jwks","key_ids":[],"claims":"sso"}]"#
                .to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidIssuers(msg)) if msg.contains("at least one key id"))
        );
    }

    #[test]
    fn test_issuers_rejects_blank_key_id() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_ISSUERS".to_string(),
            r#"[{"host":"sso.example.com","jwks_path":"/jwks","key_ids":["A",""],"claims":"sso"}]"#
                .to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidIssuers(msg)) if msg.contains("empty key id"))
        );
    }

    #[test]
    fn test_issuers_rejects_duplicate_kid_across_issuers() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_ISSUERS".to_string(),
            r#"[
                {"host":"a.example.com","jwks_path":"/jwks","key_ids":["SAME"],"claims":"sso"},
                {"host":"b.example.com","jwks_path":"/jwks","key_ids":["SAME"],"claims":"native"}
            ]"#
            .to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidIssuers(msg)) if msg.contains("more than one issuer"))
        );
    }

    #[test]
    fn test_issuers_rejects_unknown_claims_mapping() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_ISSUERS".to_string(),
            r#"[{"host":"sso.example.com","jwks_path":"/jwks","key_ids":["A"],"claims":"saml"}]"#
                .to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidIssuers(_))));
    }

    #[test]
    fn test_default_kid_rejects_empty_string() {
        let mut vars = base_vars();
        vars.insert("DEFAULT_KID".to_string(), String::new());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDefaultKid(msg)) if msg.contains("must not be empty"))
        );
    }

    #[test]
    fn test_missing_subgraphs() {
        let mut vars = base_vars();
        vars.remove("SUBGRAPHS");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "SUBGRAPHS"));
    }

    #[test]
    fn test_subgraphs_rejects_empty_array() {
        let mut vars = base_vars();
        vars.insert("SUBGRAPHS".to_string(), "[]".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidSubgraphs(msg)) if msg.contains("at least one subgraph"))
        );
    }

    #[test]
    fn test_subgraphs_rejects_non_http_url() {
        let mut vars = base_vars();
        vars.insert(
            "SUBGRAPHS".to_string(),
            r#"[{"name":"graph","url":"ftp://example.com"}]"#.to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidSubgraphs(msg)) if msg.contains("must be http(s)"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must be positive"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "-100".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must be positive"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "601".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must not exceed 600"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_accepts_max() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "600".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.jwt_clock_skew_seconds, 600);
    }

    #[test]
    fn test_jwt_clock_skew_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert(
            "JWT_CLOCK_SKEW_SECONDS".to_string(),
            "five-minutes".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must be a valid integer"))
        );
    }

    #[test]
    fn test_upload_limit_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("UPLOAD_MAX_BYTES".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidUploadLimit(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_upload_limit_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("UPLOAD_MAX_BYTES".to_string(), "ten-megabytes".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidUploadLimit(msg)) if msg.contains("must be a valid positive integer"))
        );
    }

    #[test]
    fn test_forward_headers_rejects_invalid_name() {
        let mut vars = base_vars();
        vars.insert(
            "FORWARD_HEADERS".to_string(),
            "ok-name,bad name".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidForwardHeaders(msg)) if msg.contains("bad name"))
        );
    }

    #[test]
    fn test_jwks_url_assumes_https_for_bare_host() {
        let issuer = IssuerConfig {
            host: "sso.example.com".to_string(),
            jwks_path: "/.well-known/jwks.json".to_string(),
            key_ids: vec!["A".to_string()],
            claims: ClaimsMapping::Sso,
        };

        assert_eq!(
            issuer.jwks_url(),
            "https://sso.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_jwks_url_keeps_explicit_scheme() {
        let issuer = IssuerConfig {
            host: "http://127.0.0.1:9999".to_string(),
            jwks_path: "/.well-known/jwk".to_string(),
            key_ids: vec!["A".to_string()],
            claims: ClaimsMapping::Native,
        };

        assert_eq!(issuer.jwks_url(), "http://127.0.0.1:9999/.well-known/jwk");
    }
}
