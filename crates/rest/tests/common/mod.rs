//! Export API test harness.
//!
//! Provides a configured test server backed by the in-memory source
//! adapter and a handle on the registry for direct assertions.

use std::sync::Arc;

use axum_test::TestServer;
use helios_export::{
    EngineConfig, ExportCoordinator, ExportRegistry, InMemorySource, Record,
};
use helios_export_rest::{ServerConfig, create_app_with_config};

/// Test harness for export API testing.
pub struct ExportTestHarness {
    /// The test server instance.
    pub server: TestServer,

    /// The registry backing the server.
    pub registry: Arc<ExportRegistry>,
}

impl ExportTestHarness {
    /// Creates a harness with test defaults and no source adapter.
    pub fn new() -> Self {
        Self::with_engine_config(EngineConfig::for_testing())
    }

    /// Creates a harness with a custom engine configuration.
    pub fn with_engine_config(engine: EngineConfig) -> Self {
        Self::build(None, engine)
    }

    /// Creates a harness whose adapter serves `rows`.
    pub fn with_source(rows: Vec<Record>, engine: EngineConfig) -> Self {
        Self::build(Some(Arc::new(InMemorySource::new(rows))), engine)
    }

    fn build(adapter: Option<Arc<InMemorySource>>, engine: EngineConfig) -> Self {
        let config = ServerConfig::for_testing();
        let registry = Arc::new(ExportRegistry::new(engine.retention_policy()));
        let coordinator = Arc::new(ExportCoordinator::new(
            Arc::clone(&registry),
            adapter,
            engine,
        ));
        let server = TestServer::new(create_app_with_config(coordinator, config))
            .expect("Failed to create test server");

        Self { server, registry }
    }

    /// Posts an export request and returns the parsed success `data`.
    pub async fn create_export(&self, export_type: &str, body: serde_json::Value) -> serde_json::Value {
        let response = self.server.post(&format!("/export/{}", export_type)).json(&body).await;
        assert_eq!(
            response.status_code(),
            200,
            "create failed: {}",
            response.text()
        );
        let envelope: serde_json::Value = response.json();
        assert_eq!(envelope["status"], "success");
        envelope["data"].clone()
    }
}

/// Three inline participant rows used across scenarios.
pub fn sample_participants() -> serde_json::Value {
    serde_json::json!([
        {"id": 1, "full_name": "Ada Lovelace", "email": "ada@ex.org", "country": "UK", "form_status": 2, "payment_status": 2},
        {"id": 2, "full_name": "Grace Hopper", "email": "grace@ex.org", "country": "US", "form_status": 1, "payment_status": 0},
        {"id": 3, "full_name": "Linus =SUM(1)", "email": "l@ex.org", "country": "FI", "form_status": 0, "payment_status": 4}
    ])
}

/// Inline rows of the given size.
pub fn participant_rows(count: usize) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "id": i,
                "full_name": format!("Participant {}", i),
                "email": format!("p{}@example.org", i),
                "form_status": (i % 3) as i64,
            })
        })
        .collect();
    serde_json::Value::Array(rows)
}
