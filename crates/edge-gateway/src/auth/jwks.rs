//! Issuer key store: fetches and caches signing keys from trusted issuers.
//!
//! Key sets are discovered over HTTP from each configured issuer's
//! well-known path, converted to PEM, and pinned in memory for the process
//! lifetime. The load happens lazily on the first request that needs keys;
//! concurrent requests share a single in-flight load, and a failed load is
//! not cached, so the next request retries.
//!
//! # Security
//!
//! - Only key IDs listed in issuer configuration are retained; anything
//!   else an issuer publishes is ignored
//! - Unusable key material (wrong type, wrong curve, wrong length) fails
//!   the whole load rather than degrading to a partial key set
//!
//! Known limitation: there is no refresh on an unknown kid. An issuer that
//! rotates to a kid outside the configured list needs a config change and
//! restart before its tokens verify.

use crate::auth::claims::ClaimsMapping;
use crate::config::IssuerConfig;
use crate::errors::GatewayError;
use crate::observability::metrics::{record_key_fetch, set_cached_signing_keys};
use common::jwt::{decode_ed25519_public_key_jwk, encode_ed25519_public_key_pem};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::instrument;

/// JSON Web Key from an issuer's discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP" for Ed25519).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Curve name ("Ed25519" for EdDSA).
    #[serde(default)]
    pub crv: Option<String>,

    /// Public key value (base64url encoded).
    #[serde(default)]
    pub x: Option<String>,

    /// Algorithm (should be "EdDSA").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// Key set document published at an issuer's well-known path.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// One cached signing key, ready for verification.
#[derive(Debug, Clone)]
pub struct SigningKeyEntry {
    /// Key ID tokens select this key by.
    pub kid: String,

    /// PEM-encoded public key.
    pub pem: String,

    /// Claims mapping of the issuer that published this key.
    pub mapping: ClaimsMapping,
}

/// Ordered, read-only set of cached signing keys.
///
/// Entries appear in issuer concatenation order: configured issuers in
/// order, each issuer's kids in its configured order.
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    entries: Vec<SigningKeyEntry>,
}

impl SigningKeySet {
    /// Build a set from already-ordered entries.
    #[must_use]
    pub fn new(entries: Vec<SigningKeyEntry>) -> Self {
        Self { entries }
    }

    /// Look up a key by kid. The store never substitutes a different key.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&SigningKeyEntry> {
        self.entries.iter().find(|entry| entry.kid == kid)
    }

    /// Kids in concatenation order.
    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.kid.as_str())
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no keys are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide signing key store.
///
/// Owns the lazily initialized key cache. Cloning is not needed; the store
/// lives in shared application state behind an `Arc`.
pub struct IssuerKeyStore {
    /// Trusted issuers, in concatenation order.
    issuers: Vec<IssuerConfig>,

    /// HTTP client for key discovery, with bounded timeouts.
    http_client: reqwest::Client,

    /// The once-only cache. Empty until the first successful load.
    keys: OnceCell<Arc<SigningKeySet>>,
}

impl IssuerKeyStore {
    /// Create a key store for the configured issuers.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn new(issuers: Vec<IssuerConfig>) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                tracing::error!(target: "gw.auth.jwks", error = %e, "Failed to build HTTP client");
                GatewayError::Internal
            })?;

        Ok(Self {
            issuers,
            http_client,
            keys: OnceCell::new(),
        })
    }

    /// The cached key set, or `None` before the first successful load.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<SigningKeySet>> {
        self.keys.get().cloned()
    }

    /// The signing key set, loading it on first use.
    ///
    /// Concurrent callers before the first completion share one in-flight
    /// load, so the process performs at most one round-trip per issuer.
    /// A successful result is pinned for the process lifetime.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::KeyFetch` if any issuer is unreachable,
    /// returns an error status, or is missing a configured kid. The
    /// failure is not cached; the next caller starts a fresh load.
    #[instrument(skip(self))]
    pub async fn signing_keys(&self) -> Result<Arc<SigningKeySet>, GatewayError> {
        self.keys.get_or_try_init(|| self.load_all()).await.cloned()
    }

    /// Fetch every issuer's key set concurrently and concatenate the
    /// results in issuer order.
    async fn load_all(&self) -> Result<Arc<SigningKeySet>, GatewayError> {
        let started = Instant::now();
        tracing::info!(
            target: "gw.auth.jwks",
            issuer_count = self.issuers.len(),
            "Loading signing keys"
        );

        let mut handles = Vec::with_capacity(self.issuers.len());
        for issuer in self.issuers.clone() {
            let client = self.http_client.clone();
            handles.push(tokio::spawn(fetch_issuer_keys(client, issuer)));
        }

        // Await in spawn order so the concatenation order matches the
        // configured issuer order
        let mut entries = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(issuer_entries)) => entries.extend(issuer_entries),
                Ok(Err(e)) => {
                    record_key_fetch("error", started.elapsed());
                    return Err(e);
                }
                Err(e) => {
                    record_key_fetch("error", started.elapsed());
                    return Err(GatewayError::KeyFetch(format!("key fetch task failed: {e}")));
                }
            }
        }

        tracing::info!(
            target: "gw.auth.jwks",
            key_count = entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Signing keys loaded"
        );
        record_key_fetch("ok", started.elapsed());
        set_cached_signing_keys(entries.len() as u64);

        Ok(Arc::new(SigningKeySet::new(entries)))
    }
}

/// Fetch one issuer's key set and keep only the configured kids.
async fn fetch_issuer_keys(
    client: reqwest::Client,
    issuer: IssuerConfig,
) -> Result<Vec<SigningKeyEntry>, GatewayError> {
    let url = issuer.jwks_url();
    tracing::debug!(target: "gw.auth.jwks", url = %url, "Fetching issuer key set");

    let response = client.get(&url).send().await.map_err(|e| {
        tracing::error!(target: "gw.auth.jwks", host = %issuer.host, error = %e, "Failed to fetch issuer key set");
        GatewayError::KeyFetch(format!("{}: {e}", issuer.host))
    })?;

    if !response.status().is_success() {
        tracing::error!(
            target: "gw.auth.jwks",
            host = %issuer.host,
            status = %response.status(),
            "Issuer key endpoint returned error"
        );
        return Err(GatewayError::KeyFetch(format!(
            "{} returned {}",
            issuer.host,
            response.status()
        )));
    }

    let jwks: JwksResponse = response.json().await.map_err(|e| {
        tracing::error!(target: "gw.auth.jwks", host = %issuer.host, error = %e, "Failed to parse issuer key set");
        GatewayError::KeyFetch(format!("{}: {e}", issuer.host))
    })?;

    // Retain only configured kids, in configured order; unlisted keys in
    // the response are ignored
    let mut entries = Vec::with_capacity(issuer.key_ids.len());
    for kid in &issuer.key_ids {
        let jwk = jwks.keys.iter().find(|key| key.kid == *kid).ok_or_else(|| {
            tracing::error!(target: "gw.auth.jwks", host = %issuer.host, kid = %kid, "Issuer key set is missing a configured kid");
            GatewayError::KeyFetch(format!("{} did not publish kid {kid}", issuer.host))
        })?;

        let pem = jwk_to_pem(jwk).map_err(|detail| {
            tracing::error!(target: "gw.auth.jwks", host = %issuer.host, kid = %kid, detail = %detail, "Issuer published unusable key material");
            GatewayError::KeyFetch(format!("{} kid {kid}: {detail}", issuer.host))
        })?;

        entries.push(SigningKeyEntry {
            kid: kid.clone(),
            pem,
            mapping: issuer.claims,
        });
    }

    tracing::debug!(
        target: "gw.auth.jwks",
        host = %issuer.host,
        key_count = entries.len(),
        "Issuer key set loaded"
    );

    Ok(entries)
}

/// Convert an OKP JWK into a PEM public key string.
///
/// The error string is an operator-facing reason; callers wrap it in
/// `GatewayError::KeyFetch`.
fn jwk_to_pem(jwk: &Jwk) -> Result<String, String> {
    if jwk.kty != "OKP" {
        return Err(format!("unsupported kty '{}'", jwk.kty));
    }

    if let Some(crv) = &jwk.crv {
        if crv != "Ed25519" {
            return Err(format!("unsupported crv '{crv}'"));
        }
    }

    if let Some(alg) = &jwk.alg {
        if alg != "EdDSA" {
            return Err(format!("unsupported alg '{alg}'"));
        }
    }

    let x = jwk
        .x
        .as_deref()
        .filter(|x| !x.is_empty())
        .ok_or_else(|| "empty public key".to_string())?;

    let raw = decode_ed25519_public_key_jwk(x).map_err(|e| format!("invalid base64url: {e}"))?;
    let raw: [u8; 32] = raw
        .try_into()
        .map_err(|_| "public key is not 32 bytes".to_string())?;

    Ok(encode_ed25519_public_key_pem(&raw))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn ed25519_jwk(kid: &str, raw: &[u8; 32]) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            kid: kid.to_string(),
            crv: Some("Ed25519".to_string()),
            x: Some(URL_SAFE_NO_PAD.encode(raw)),
            alg: Some("EdDSA".to_string()),
            key_use: Some("sig".to_string()),
        }
    }

    #[test]
    fn test_jwk_deserialization() {
        let json = r#"{
            "kty": "OKP",
            "kid": "PK11T",
            "crv": "Ed25519",
            "x": "dGVzdC1wdWJsaWMta2V5LWRhdGE",
            "alg": "EdDSA",
            "use": "sig"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.kid, "PK11T");
        assert_eq!(jwk.crv, Some("Ed25519".to_string()));
        assert_eq!(jwk.x, Some("dGVzdC1wdWJsaWMta2V5LWRhdGE".to_string()));
        assert_eq!(jwk.alg, Some("EdDSA".to_string()));
        assert_eq!(jwk.key_use, Some("sig".to_string()));
    }

    #[test]
    fn test_jwk_deserialization_minimal() {
        // Only required fields
        let json = r#"{
            "kty": "OKP",
            "kid": "PK12T"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.kid, "PK12T");
        assert!(jwk.crv.is_none());
        assert!(jwk.x.is_none());
        assert!(jwk.alg.is_none());
        assert!(jwk.key_use.is_none());
    }

    #[test]
    fn test_jwks_response_deserialization() {
        let json = r#"{
            "keys": [
                {"kty": "OKP", "kid": "key-1"},
                {"kty": "OKP", "kid": "key-2"}
            ]
        }"#;

        let jwks: JwksResponse = serde_json::from_str(json).unwrap();

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys.first().unwrap().kid, "key-1");
        assert_eq!(jwks.keys.get(1).unwrap().kid, "key-2");
    }

    #[test]
    fn test_signing_key_set_lookup_and_order() {
        let set = SigningKeySet::new(vec![
            SigningKeyEntry {
                kid: "A1".to_string(),
                pem: "pem-a1".to_string(),
                mapping: ClaimsMapping::Sso,
            },
            SigningKeyEntry {
                kid: "A2".to_string(),
                pem: "pem-a2".to_string(),
                mapping: ClaimsMapping::Sso,
            },
            SigningKeyEntry {
                kid: "B1".to_string(),
                pem: "pem-b1".to_string(),
                mapping: ClaimsMapping::Native,
            },
        ]);

        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
        assert_eq!(set.get("A2").unwrap().pem, "pem-a2");
        assert_eq!(set.get("A2").unwrap().mapping, ClaimsMapping::Sso);
        assert_eq!(set.get("B1").unwrap().mapping, ClaimsMapping::Native);
        assert!(set.get("missing").is_none());

        // Concatenation order is preserved
        let kids: Vec<&str> = set.kids().collect();
        assert_eq!(kids, vec!["A1", "A2", "B1"]);
    }

    #[test]
    fn test_store_starts_without_cached_keys() {
        let store = IssuerKeyStore::new(vec![IssuerConfig {
            host: "sso.example.com".to_string(),
            jwks_path: "/.well-known/jwks.json".to_string(),
            key_ids: vec!["A1".to_string()],
            claims: ClaimsMapping::Sso,
        }])
        .expect("key store with bounded timeouts should build");

        assert!(store.cached().is_none());
    }

    #[test]
    fn test_jwk_to_pem_valid_key() {
        let jwk = ed25519_jwk("PK11T", &[9u8; 32]);

        let pem = jwk_to_pem(&jwk).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(pem.trim_end().ends_with("-----END PUBLIC KEY-----"));
    }

    #[test]
    fn test_jwk_to_pem_minimal_okp_key() {
        // crv/alg absent: accepted, the kty and key bytes carry the contract
        let jwk = Jwk {
            kty: "OKP".to_string(),
            kid: "PK11T".to_string(),
            crv: None,
            x: Some(URL_SAFE_NO_PAD.encode([9u8; 32])),
            alg: None,
            key_use: None,
        };

        assert!(jwk_to_pem(&jwk).is_ok());
    }

    #[test]
    fn test_jwk_to_pem_rejects_wrong_kty() {
        let mut jwk = ed25519_jwk("PK11T", &[9u8; 32]);
        jwk.kty = "RSA".to_string();

        let err = jwk_to_pem(&jwk).unwrap_err();
        assert!(err.contains("unsupported kty"));
    }

    #[test]
    fn test_jwk_to_pem_rejects_wrong_curve() {
        let mut jwk = ed25519_jwk("PK11T", &[9u8; 32]);
        jwk.crv = Some("P-256".to_string());

        let err = jwk_to_pem(&jwk).unwrap_err();
        assert!(err.contains("unsupported crv"));
    }

    #[test]
    fn test_jwk_to_pem_rejects_wrong_alg() {
        let mut jwk = ed25519_jwk("PK11T", &[9u8; 32]);
        jwk.alg = Some("RS256".to_string());

        let err = jwk_to_pem(&jwk).unwrap_err();
        assert!(err.contains("unsupported alg"));
    }

    #[test]
    fn test_jwk_to_pem_rejects_missing_key_material() {
        let mut jwk = ed25519_jwk("PK11T", &[9u8; 32]);
        jwk.x = None;
        assert_eq!(jwk_to_pem(&jwk).unwrap_err(), "empty public key");

        jwk.x = Some(String::new());
        assert_eq!(jwk_to_pem(&jwk).unwrap_err(), "empty public key");
    }

    #[test]
    fn test_jwk_to_pem_rejects_wrong_length() {
        let mut jwk = ed25519_jwk("PK11T", &[9u8; 32]);
        jwk.x = Some(URL_SAFE_NO_PAD.encode([9u8; 16]));

        let err = jwk_to_pem(&jwk).unwrap_err();
        assert!(err.contains("not 32 bytes"));
    }

    #[test]
    fn test_jwk_to_pem_rejects_invalid_base64() {
        let mut jwk = ed25519_jwk("PK11T", &[9u8; 32]);
        jwk.x = Some("!!!not-base64url!!!".to_string());

        let err = jwk_to_pem(&jwk).unwrap_err();
        assert!(err.contains("invalid base64url"));
    }
}
