//! HTTP request handlers for the gateway.

pub mod graphql;
pub mod health;
pub mod metrics;

pub use graphql::graphql_proxy;
pub use health::health_check;
pub use metrics::metrics_handler;
