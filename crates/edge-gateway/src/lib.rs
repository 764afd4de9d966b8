//! Edge Gateway Service Library
//!
//! This library provides the core functionality for the GraphQL federation
//! edge gateway - a stateless HTTP front door responsible for:
//!
//! - Multi-issuer JWT verification with cached signing keys
//! - Normalized user identity derivation from issuer claims
//! - Per-request context construction (token, identity, forward headers)
//! - Header propagation and operation dispatch to downstream subgraphs
//!
//! # Architecture
//!
//! Requests flow through a middleware/handler pipeline:
//!
//! ```text
//! routes/mod.rs -> middleware/context.rs -> handlers/*.rs -> services/*.rs
//!                         |
//!                  auth/{jwks,jwt,identity}.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Signing key store, token verification, identity mapping
//! - `config` - Service configuration from environment
//! - `context` - Per-request context assembly
//! - `errors` - Error taxonomy with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Context-building middleware
//! - `models` - Response models
//! - `observability` - Metrics recording helpers
//! - `routes` - Axum router setup
//! - `services` - Subgraph clients, header propagation, error reporting

pub mod auth;
pub mod config;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
