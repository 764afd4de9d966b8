//! HTTP routes for the gateway.
//!
//! Defines the Axum router, application state, and the Prometheus
//! recorder installation.

use crate::auth::jwks::IssuerKeyStore;
use crate::auth::jwt::TokenVerifier;
use crate::config::Config;
use crate::handlers;
use crate::middleware::context::{build_context, ContextState};
use crate::services::subgraph_client::SubgraphClient;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Arc<Config>,

    /// Issuer key store with the once-only key cache.
    pub key_store: Arc<IssuerKeyStore>,

    /// Token verifier.
    pub verifier: Arc<TokenVerifier>,

    /// HTTP client for subgraph dispatch.
    pub subgraph_client: Arc<SubgraphClient>,
}

/// Initialize the Prometheus metrics recorder and return the handle for
/// serving metrics over HTTP.
///
/// Must be called before any metrics are recorded. Histogram buckets are
/// sized per concern: context construction is sub-millisecond work, key
/// loads and subgraph calls are network round-trips.
///
/// # Errors
///
/// Returns an error if the recorder fails to install (e.g. already
/// installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gw_auth".to_string()),
            &[0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250],
        )
        .map_err(|e| format!("Failed to set auth buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("gw_key_fetch".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set key fetch buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("gw_subgraph".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set subgraph buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `POST /` - GraphQL proxy, context middleware applied
/// - `GET /health` - Health check endpoint
/// - `GET /metrics` - Prometheus scrape endpoint
/// - TraceLayer for request logging, 30 second request timeout, and a
///   configurable body size limit
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let context_state = ContextState {
        config: state.config.clone(),
        key_store: state.key_store.clone(),
        verifier: state.verifier.clone(),
    };

    let upload_max_bytes = state.config.upload_max_bytes;

    // The context middleware applies to proxied traffic only; operational
    // endpoints never touch signing keys
    let proxy_routes = Router::new()
        .route("/", post(handlers::graphql_proxy))
        .route_layer(from_fn_with_state(context_state, build_context))
        .with_state(state.clone());

    let operational_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
        .route(
            "/metrics",
            get(handlers::metrics_handler).with_state(metrics_handle),
        );

    proxy_routes
        .merge(operational_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(DefaultBodyLimit::max(upload_max_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // Required for Axum's State extractor
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
