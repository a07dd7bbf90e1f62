//! Metrics and observability utilities
//!
//! Prometheus metrics with SLO-aligned histograms and standardized naming
//! conventions. Recording is a no-op until a recorder is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CaseForge metrics
pub const METRICS_PREFIX: &str = "caseforge";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 100ms, P99 < 1s
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms - P50 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s - P99 target
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_histogram!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of rows returned per search page"
    );

    // Storage metrics
    describe_counter!(
        format!("{}_storage_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total queries sent to the case store"
    );

    describe_histogram!(
        format!("{}_storage_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Case store query latency in seconds"
    );

    // Case lookup metrics
    describe_counter!(
        format!("{}_case_lookups_total", METRICS_PREFIX),
        Unit::Count,
        "Total lookups by derived case id"
    );

    describe_histogram!(
        format!("{}_case_lookup_scanned_rows", METRICS_PREFIX),
        Unit::Count,
        "Rows re-hashed per lookup"
    );

    describe_counter!(
        format!("{}_case_id_collisions_total", METRICS_PREFIX),
        Unit::Count,
        "Lookups where several rows shared the derived id"
    );

    // Export metrics
    describe_counter!(
        format!("{}_exports_total", METRICS_PREFIX),
        Unit::Count,
        "Total CSV exports"
    );

    describe_counter!(
        format!("{}_exported_rows_total", METRICS_PREFIX),
        Unit::Count,
        "Total rows written to CSV exports"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, result_count: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    histogram!(format!("{}_search_results_count", METRICS_PREFIX)).record(result_count as f64);
}

/// Helper to record case store metrics
pub fn record_storage_query(duration_secs: f64, backend: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_storage_queries_total", METRICS_PREFIX),
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_storage_query_duration_seconds", METRICS_PREFIX),
        "backend" => backend.to_string()
    )
    .record(duration_secs);
}

/// Helper to record a lookup by derived case id
pub fn record_case_lookup(found: bool, scanned_rows: usize) {
    let outcome = if found { "found" } else { "not_found" };

    counter!(
        format!("{}_case_lookups_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(format!("{}_case_lookup_scanned_rows", METRICS_PREFIX)).record(scanned_rows as f64);
}

pub fn record_case_id_collision() {
    counter!(format!("{}_case_id_collisions_total", METRICS_PREFIX)).increment(1);
}

/// Helper to record export metrics
pub fn record_export(rows: usize) {
    counter!(format!("{}_exports_total", METRICS_PREFIX)).increment(1);
    counter!(format!("{}_exported_rows_total", METRICS_PREFIX)).increment(rows as u64);
}
