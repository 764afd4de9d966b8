//! Context middleware for proxied routes.
//!
//! Builds a [`RequestContext`] for every request and injects it into
//! request extensions. Failures short-circuit with the taxonomy response;
//! the proxy handler can rely on the extension being present.

use crate::auth::jwks::IssuerKeyStore;
use crate::auth::jwt::TokenVerifier;
use crate::config::Config;
use crate::context::RequestContext;
use crate::errors::GatewayError;
use crate::observability::metrics::record_auth_outcome;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// State for the context middleware.
#[derive(Clone)]
pub struct ContextState {
    /// Gateway configuration.
    pub config: Arc<Config>,

    /// Issuer key store.
    pub key_store: Arc<IssuerKeyStore>,

    /// Token verifier.
    pub verifier: Arc<TokenVerifier>,
}

/// Middleware that builds the request context.
///
/// # Response
///
/// - Continues to the handler with `Arc<RequestContext>` in extensions
/// - Short-circuits with the mapped error response when context
///   construction fails
#[instrument(skip(state, req, next), name = "gw.middleware.context")]
pub async fn build_context(
    State(state): State<ContextState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GatewayError> {
    let started = Instant::now();

    let context = match RequestContext::from_headers(
        req.headers(),
        &state.key_store,
        &state.verifier,
        &state.config.forward_header_names,
    )
    .await
    {
        Ok(context) => context,
        Err(error) => {
            record_auth_outcome(error.outcome_label(), started.elapsed());
            return Err(error);
        }
    };

    let outcome = if context.is_authenticated() {
        "ok"
    } else {
        "anonymous"
    };
    record_auth_outcome(outcome, started.elapsed());

    req.extensions_mut().insert(Arc::new(context));
    Ok(next.run(req).await)
}
