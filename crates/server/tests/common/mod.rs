//! Common test utilities for in-process API testing.
//!
//! The fixture builds the real router over in-memory stores, with a mock
//! image renderer standing in for the external rendering service.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use raffle_core::{
    testing::MockImageRenderer, Config, IdentifierCodec, JobStatus, OrchestratorConfig,
    PrintJobOrchestrator, SqliteJobStore, SqliteTicketStore, TemplateCatalog, TicketStore,
};
use raffle_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use raffle_core::testing::fixtures;

/// In-process server with a controllable renderer.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_pool() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/tickets/pool", json!({
///         "category": "A", "first": 1, "last": 10
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock renderer - configure failures and delays
    pub renderer: Arc<MockImageRenderer>,
    /// Ticket store shared with the router
    pub tickets: Arc<SqliteTicketStore>,
    pub codec: Arc<IdentifierCodec>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with printing enabled.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Fixture without a renderer, as when `[renderer]` is not configured.
    pub fn without_renderer() -> Self {
        Self::build(false)
    }

    fn build(with_renderer: bool) -> Self {
        let config = Config::default();
        let codec = Arc::new(IdentifierCodec::new(&config.codec).expect("default codec"));
        let templates = Arc::new(TemplateCatalog::builtin());
        let tickets = Arc::new(SqliteTicketStore::in_memory().expect("ticket store"));
        let renderer = Arc::new(MockImageRenderer::new());

        let orchestrator = with_renderer.then(|| {
            Arc::new(PrintJobOrchestrator::new(
                OrchestratorConfig {
                    batch_size: 5,
                    ..Default::default()
                },
                Arc::clone(&codec),
                Arc::clone(&templates),
                Arc::clone(&tickets) as Arc<dyn TicketStore>,
                Arc::new(SqliteJobStore::in_memory().expect("job store")),
                Arc::clone(&renderer) as _,
            ))
        });

        let state = Arc::new(AppState::new(
            config,
            "0123456789abcdef".to_string(),
            Arc::clone(&codec),
            templates,
            Arc::clone(&tickets) as Arc<dyn TicketStore>,
            orchestrator,
        ));

        Self {
            router: create_router(state),
            renderer,
            tickets,
            codec,
        }
    }

    /// Canonical barcode string for a ticket.
    pub fn barcode(&self, category: raffle_core::Category, sequence: u32) -> String {
        self.codec
            .encode(category, sequence)
            .expect("encodable")
            .into_string()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Fetch the raw text body of a GET request.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Poll a job until it reaches `expected` or the timeout elapses.
    pub async fn wait_for_job(&self, job_id: &str, expected: JobStatus) -> Option<Value> {
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            let response = self.get(&format!("/api/v1/print-jobs/{}", job_id)).await;
            if response.body["status"] == expected.as_str() && response.body["running"] == false
            {
                return Some(response.body);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
