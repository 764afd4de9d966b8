//! Downstream-facing services.
//!
//! Header propagation ([`propagation`]), subgraph dispatch
//! ([`subgraph_client`]), and the reporting seam for unexpected failures
//! ([`error_reporter`]).

pub mod error_reporter;
pub mod propagation;
pub mod subgraph_client;
