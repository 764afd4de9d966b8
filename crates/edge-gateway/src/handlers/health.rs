//! Health check handler.
//!
//! Provides the health endpoint for liveness probes.

use crate::errors::GatewayError;
use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Health check handler.
///
/// Reports the configured subgraphs and whether the signing key cache has
/// been populated yet. The key cache fills lazily, so `keys_loaded`
/// starts false and flips after the first proxied request succeeds in
/// loading keys.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "subgraphs": ["graph"],
///   "keys_loaded": true
/// }
/// ```
#[instrument(skip_all, name = "gw.health.check")]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, GatewayError> {
    let response = HealthResponse {
        status: "healthy".to_string(),
        subgraphs: state
            .config
            .subgraphs
            .iter()
            .map(|subgraph| subgraph.name.clone())
            .collect(),
        keys_loaded: state.key_store.cached().is_some(),
    };

    Ok(Json(response))
}
