//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate so every member
//! of the workspace imports them through one path. Use these types for all
//! sensitive values the gateway handles: bearer tokens, API keys, and any
//! credential material that passes through a request.
//!
//! # Compile-Time Safety
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so
//! any struct that derives `Debug` while holding a secret gets safe logging
//! behavior for free. A raw token can only leave the wrapper through an
//! explicit [`ExposeSecret::expose_secret`] call, which keeps the exposure
//! sites greppable.
//!
//! # Memory Safety
//!
//! Secrets are zeroized when dropped, so token bytes do not linger in
//! memory after the request that carried them completes.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct InboundAuth {
//!     scheme: String,
//!     bearer: SecretString,  // Debug shows "[REDACTED]"
//! }
//!
//! let auth = InboundAuth {
//!     scheme: "Bearer".to_string(),
//!     bearer: SecretString::from("eyJhbGciOiJFZERTQSJ9.e30.sig"),
//! };
//!
//! // Safe: the token is redacted
//! println!("{:?}", auth);
//!
//! // Reading the value requires an explicit expose_secret()
//! let raw: &str = auth.bearer.expose_secret();
//! # let _ = raw;
//! ```
//!
//! # Usage Guidelines
//!
//! Use `SecretString` for:
//! - Raw bearer tokens carried in a request context
//! - Downstream service credentials
//! - Encryption keys handled as base64 strings
//!
//! Use `SecretBox<T>` for custom secret types (e.g., `SecretBox<[u8]>` for
//! binary key material).

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
