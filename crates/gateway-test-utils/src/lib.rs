//! # Gateway Test Utilities
//!
//! Shared test utilities for the edge gateway.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keypairs for reproducible JWKS)
//! - Claim builders (`SsoClaimsBuilder`, `NativeClaimsBuilder`)
//! - Server test harness (`TestGateway` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestGateway::spawn().await?;
//!     let token = server.create_sso_token();
//!
//!     let response = reqwest::Client::new()
//!         .post(server.url())
//!         .header("Authorization", format!("Bearer {}", token))
//!         .json(&serde_json::json!({"query": "{ __typename }"}))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
