//! Gateway models.
//!
//! Data types shared across handlers.

use serde::{Deserialize, Serialize};

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status.
    pub status: String,

    /// Configured subgraph names, in dispatch order.
    pub subgraphs: Vec<String>,

    /// Whether the signing key cache has been populated.
    pub keys_loaded: bool,
}
