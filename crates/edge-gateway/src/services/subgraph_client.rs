//! Subgraph HTTP client.
//!
//! Dispatches proxied GraphQL requests to downstream subgraphs with
//! bounded timeouts. Subgraph responses pass back to the client verbatim,
//! status included; only transport failures become gateway errors.

use crate::config::SubgraphConfig;
use crate::errors::GatewayError;
use crate::observability::metrics::record_subgraph_request;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Timeout for a proxied subgraph request in seconds. Kept below the
/// route-level timeout so a slow subgraph surfaces as a gateway error.
const SUBGRAPH_TIMEOUT_SECS: u64 = 25;

/// Connect timeout in seconds.
const SUBGRAPH_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Response from a subgraph, ready to relay to the client.
#[derive(Debug)]
pub struct SubgraphReply {
    /// Subgraph status, relayed verbatim.
    pub status: StatusCode,

    /// Subgraph content type, relayed when present.
    pub content_type: Option<HeaderValue>,

    /// Raw response body.
    pub body: Bytes,
}

/// HTTP client for subgraph dispatch.
pub struct SubgraphClient {
    http_client: reqwest::Client,
}

impl SubgraphClient {
    /// Create a new subgraph client with bounded timeouts.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SUBGRAPH_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(SUBGRAPH_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                tracing::error!(target: "gw.proxy", error = %e, "Failed to build HTTP client");
                GatewayError::Internal
            })?;

        Ok(Self { http_client })
    }

    /// Execute a proxied request against one subgraph.
    ///
    /// The header set must already be stamped; this method adds nothing.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::SubgraphUnavailable` when the subgraph
    /// cannot be reached or the response body cannot be read. Error
    /// statuses from a reachable subgraph are not errors here; they relay
    /// to the client as-is.
    #[instrument(skip(self, headers, body), fields(subgraph = %subgraph.name))]
    pub async fn execute(
        &self,
        subgraph: &SubgraphConfig,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<SubgraphReply, GatewayError> {
        let started = Instant::now();

        let response = self
            .http_client
            .post(&subgraph.url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: "gw.proxy", subgraph = %subgraph.name, error = %e, "Subgraph request failed");
                GatewayError::SubgraphUnavailable(format!("{}: {e}", subgraph.name))
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .cloned();

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(target: "gw.proxy", subgraph = %subgraph.name, error = %e, "Subgraph response body read failed");
            GatewayError::SubgraphUnavailable(format!("{}: {e}", subgraph.name))
        })?;

        record_subgraph_request(&subgraph.name, status.as_u16(), started.elapsed());
        tracing::debug!(
            target: "gw.proxy",
            subgraph = %subgraph.name,
            status = %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Subgraph request completed"
        );

        Ok(SubgraphReply {
            status,
            content_type,
            body,
        })
    }
}
