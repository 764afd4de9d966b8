//! Test server harness for E2E testing
//!
//! Provides `TestGateway` for spawning real gateway instances in tests,
//! fronted by wiremock JWKS and subgraph servers.

use crate::crypto_fixtures::{jwks_document, TestKeypair};
use crate::token_builders::SsoClaimsBuilder;
use chrono::Utc;
use edge_gateway::auth::jwks::IssuerKeyStore;
use edge_gateway::auth::jwt::TokenVerifier;
use edge_gateway::config::Config;
use edge_gateway::routes::{self, AppState};
use edge_gateway::services::error_reporter::LogReporter;
use edge_gateway::services::subgraph_client::SubgraphClient;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Key ID the default harness keypair publishes under.
pub const TEST_KID: &str = "test-key-01";

/// Global metrics handle shared by all test servers in a process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Returns the process-wide metrics handle, installing the recorder on
/// first use.
///
/// The Prometheus recorder is process-global; individual test servers
/// cannot each install their own.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            routes::init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the gateway in E2E tests.
///
/// Wires a mock JWKS server (publishing one deterministic keypair) and a
/// mock subgraph behind a real gateway listening on a random port.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_graphql_flow_e2e() -> Result<(), anyhow::Error> {
///     let server = TestGateway::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .post(server.url())
///         .header("Authorization", format!("Bearer {}", server.create_sso_token()))
///         .json(&serde_json::json!({"query": "{ __typename }"}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGateway {
    addr: SocketAddr,
    config: Arc<Config>,
    jwks_server: MockServer,
    subgraph_server: MockServer,
    keypair: TestKeypair,
    _handle: JoinHandle<()>,
}

impl TestGateway {
    /// Spawn a gateway with one SSO issuer and one subgraph, both mocked.
    ///
    /// The JWKS endpoint publishes a single deterministic keypair under
    /// [`TEST_KID`]. The subgraph answers every POST to `/graphql` with a
    /// minimal GraphQL data envelope.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn with environment overrides layered over the harness defaults.
    ///
    /// Overrides win; tests can re-point `GATEWAY_ISSUERS` at their own
    /// mock servers or set `DEFAULT_KID` without rebuilding the harness.
    pub async fn spawn_with_vars(
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let jwks_server = MockServer::start().await;
        let subgraph_server = MockServer::start().await;
        let keypair = TestKeypair::new(1, TEST_KID);

        // Set up JWKS endpoint
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(&[&keypair])))
            .mount(&jwks_server)
            .await;

        // Default subgraph: answer every operation with an empty data set
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {}})))
            .mount(&subgraph_server)
            .await;

        // Build configuration pointing at the mock servers
        let issuers = serde_json::json!([{
            "host": jwks_server.uri(),
            "jwks_path": "/.well-known/jwks.json",
            "key_ids": [TEST_KID],
            "claims": "sso"
        }]);
        let subgraphs = serde_json::json!([{
            "name": "graph",
            "url": format!("{}/graphql", subgraph_server.uri())
        }]);

        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("GATEWAY_ISSUERS".to_string(), issuers.to_string()),
            ("SUBGRAPHS".to_string(), subgraphs.to_string()),
            ("GATEWAY_ID".to_string(), "gw-test-001".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;
        let config = Arc::new(config);

        // Create application state
        let state = Arc::new(AppState {
            config: config.clone(),
            key_store: Arc::new(IssuerKeyStore::new(config.issuers.clone())?),
            verifier: Arc::new(TokenVerifier::new(
                config.default_kid.clone(),
                config.jwt_clock_skew_seconds,
                Arc::new(LogReporter),
            )),
            subgraph_client: Arc::new(SubgraphClient::new()?),
        });

        // Build routes with the shared metrics handle
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            // Use into_make_service_with_connect_info to support SocketAddr extraction
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            jwks_server,
            subgraph_server,
            keypair,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The keypair the mock JWKS endpoint publishes.
    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// The mock JWKS server, for mounting custom responses.
    pub fn jwks_server(&self) -> &MockServer {
        &self.jwks_server
    }

    /// The mock subgraph server, for mounting custom responses and
    /// inspecting received requests.
    pub fn subgraph_server(&self) -> &MockServer {
        &self.subgraph_server
    }

    /// Replace the published JWKS with different keypairs.
    ///
    /// Only affects fetches that happen after the call; a gateway that
    /// already cached its keys never refetches.
    pub async fn replace_jwks(&self, keypairs: &[&TestKeypair]) {
        self.jwks_server.reset().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keypairs)))
            .mount(&self.jwks_server)
            .await;
    }

    /// Create a valid SSO token signed with the published keypair.
    pub fn create_sso_token(&self) -> String {
        self.keypair.sign(&SsoClaimsBuilder::new().build())
    }

    /// Create a token that expired an hour ago.
    pub fn create_expired_token(&self) -> String {
        let now = Utc::now().timestamp();
        let claims = SsoClaimsBuilder::new()
            .expires_in(-3600)
            .issued_at(now - 7200)
            .build();
        self.keypair.sign(&claims)
    }

    /// Create a token whose iat lies an hour in the future.
    pub fn create_future_iat_token(&self) -> String {
        let now = Utc::now().timestamp();
        let claims = SsoClaimsBuilder::new()
            .expires_in(7200)
            .issued_at(now + 3600)
            .build();
        self.keypair.sign(&claims)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        // Explicitly abort the HTTP server task to ensure immediate cleanup
        // when the test completes. This stops the server gracefully.
        self._handle.abort();
    }
}
