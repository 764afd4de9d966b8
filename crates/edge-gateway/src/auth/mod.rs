//! Authentication for the gateway edge.
//!
//! Issuer key discovery and caching ([`jwks`]), bearer token verification
//! ([`jwt`]), and derivation of a normalized identity from verified claims
//! ([`claims`], [`identity`]).

pub mod claims;
pub mod identity;
pub mod jwks;
pub mod jwt;

pub use claims::{ClaimsMapping, NativeIdentity, NormalizedIdentity, SsoIdentity};
pub use jwks::{IssuerKeyStore, SigningKeyEntry, SigningKeySet};
pub use jwt::{TokenVerifier, VerifiedToken};
