//! GraphQL proxy handler.
//!
//! Relays the request body to the dispatch subgraph with stamped headers
//! and relays the subgraph response back verbatim. The body is opaque
//! here; GraphQL execution belongs to the subgraphs.

use crate::context::RequestContext;
use crate::errors::GatewayError;
use crate::routes::AppState;
use crate::services::propagation::stamp_subgraph_headers;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Response};
use axum::Extension;
use bytes::Bytes;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /.
///
/// The context middleware has already run; every request arriving here
/// carries an `Arc<RequestContext>` extension, anonymous or not.
///
/// # Errors
///
/// - `GatewayError::Internal` when the stamped headers cannot be built
///   or the response cannot be assembled
/// - `GatewayError::SubgraphUnavailable` when the subgraph is unreachable
#[instrument(skip_all, name = "gw.graphql.proxy")]
pub async fn graphql_proxy(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<Arc<RequestContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response<Body>, GatewayError> {
    // Config validation guarantees at least one subgraph
    let subgraph = state.config.subgraphs.first().ok_or_else(|| {
        tracing::error!(target: "gw.proxy", "No subgraphs configured");
        GatewayError::Internal
    })?;

    let mut outbound = stamp_subgraph_headers(
        context.raw_token(),
        context.identity(),
        context.forward_headers(),
    )?;

    // Relay the inbound content type so uploads keep their multipart
    // boundary
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        outbound.insert(header::CONTENT_TYPE, content_type.clone());
    }

    let reply = state
        .subgraph_client
        .execute(subgraph, outbound, body)
        .await?;

    let mut builder = Response::builder().status(reply.status);
    if let Some(content_type) = reply.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    builder.body(Body::from(reply.body)).map_err(|e| {
        tracing::error!(target: "gw.proxy", error = %e, "Failed to assemble relay response");
        GatewayError::Internal
    })
}
