//! Observability for the gateway edge.
//!
//! Metric recording helpers live in [`metrics`]. Structured logging is
//! plain `tracing` with dotted targets (`gw.auth.jwt`, `gw.auth.jwks`,
//! `gw.context`, `gw.proxy`); tokens and identity fields never appear in
//! log output.

pub mod metrics;
