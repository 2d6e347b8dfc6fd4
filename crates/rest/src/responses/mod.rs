//! Response envelope construction.
//!
//! Successful responses share one envelope:
//!
//! ```json
//! { "status": "success", "data": {...}, "performance_metrics": {...}, "system_info": {...} }
//! ```
//!
//! The body of a download response IS the artifact; everything else is
//! JSON in this envelope.

use axum::Json;
use helios_export::ProcessingMetrics;
use serde_json::{Value, json};

/// Name reported in `system_info.service`.
pub const SERVICE_NAME: &str = "helios-export-service";

/// Builds the success envelope around `data`.
pub fn success(data: Value, metrics: Option<&ProcessingMetrics>) -> Json<Value> {
    let performance_metrics = match metrics {
        Some(metrics) => serde_json::to_value(metrics).unwrap_or_else(|_| json!({})),
        None => json!({}),
    };
    Json(json!({
        "status": "success",
        "data": data,
        "performance_metrics": performance_metrics,
        "system_info": system_info(),
    }))
}

/// The static service descriptor attached to every success envelope.
pub fn system_info() -> Value {
    json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let Json(body) = success(json!({"export_id": "x"}), None);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["export_id"], "x");
        assert_eq!(body["system_info"]["service"], SERVICE_NAME);
        assert!(body["performance_metrics"].is_object());
    }

    #[test]
    fn metrics_are_embedded() {
        let metrics = ProcessingMetrics {
            elapsed_ms: 12,
            peak_rss_mb: None,
            bytes_per_record: 100.0,
            records_per_second: 250.0,
            chunk_elapsed_ms: Vec::new(),
        };
        let Json(body) = success(json!({}), Some(&metrics));
        assert_eq!(body["performance_metrics"]["elapsed_ms"], 12);
    }
}
