//! Metrics definitions for the gateway edge.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gw_` prefix for the gateway
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: one value per error taxonomy entry plus `ok` and
//!   `anonymous` (12 values max)
//! - `status`: 2 values (ok, error)
//! - `subgraph`: bounded by configuration
//! - `status_code`: bounded by HTTP

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record a context construction outcome.
///
/// Metric: `gw_auth_outcomes_total`, `gw_auth_duration_seconds`
/// Labels: `outcome`
pub fn record_auth_outcome(outcome: &str, duration: Duration) {
    histogram!("gw_auth_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());

    counter!("gw_auth_outcomes_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Signing Key Metrics
// ============================================================================

/// Record a signing key load attempt.
///
/// Metric: `gw_key_fetch_total`, `gw_key_fetch_duration_seconds`
/// Labels: `status`
pub fn record_key_fetch(status: &str, duration: Duration) {
    histogram!("gw_key_fetch_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("gw_key_fetch_total", "status" => status.to_string()).increment(1);
}

/// Update the cached signing key count.
///
/// Metric: `gw_cached_signing_keys`
pub fn set_cached_signing_keys(count: u64) {
    gauge!("gw_cached_signing_keys").set(count as f64);
}

// ============================================================================
// Subgraph Metrics
// ============================================================================

/// Record a proxied subgraph request.
///
/// Metric: `gw_subgraph_requests_total`, `gw_subgraph_request_duration_seconds`
/// Labels: `subgraph`, `status_code`
pub fn record_subgraph_request(subgraph: &str, status_code: u16, duration: Duration) {
    histogram!("gw_subgraph_request_duration_seconds", "subgraph" => subgraph.to_string())
        .record(duration.as_secs_f64());

    counter!("gw_subgraph_requests_total",
        "subgraph" => subgraph.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}
