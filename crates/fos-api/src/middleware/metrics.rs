//! # Prometheus Metrics
//!
//! Request metrics exported through a `prometheus` registry.
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (customers, work orders, tasks, visits,
//! evidence) are updated on each `/metrics` scrape (pull model); see the
//! metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, Gauge, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    users_total: Gauge,
    customers_total: Gauge,
    sites_total: Gauge,
    work_orders_total: GaugeVec,
    tasks_total: GaugeVec,
    visits_total: GaugeVec,
    evidence_records_total: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("fos_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "fos_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("fos_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let users_total =
            Gauge::new("fos_users_total", "Total users in the directory").expect("metric can be created");

        let customers_total =
            Gauge::new("fos_customers_total", "Total customers").expect("metric can be created");

        let sites_total =
            Gauge::new("fos_sites_total", "Total sites").expect("metric can be created");

        let work_orders_total = GaugeVec::new(
            Opts::new("fos_work_orders_total", "Total work orders by status"),
            &["status"],
        )
        .expect("metric can be created");

        let tasks_total = GaugeVec::new(
            Opts::new("fos_tasks_total", "Total tasks by status"),
            &["status"],
        )
        .expect("metric can be created");

        let visits_total = GaugeVec::new(
            Opts::new("fos_visits_total", "Total visits by status"),
            &["status"],
        )
        .expect("metric can be created");

        let evidence_records_total = Gauge::new(
            "fos_evidence_records_total",
            "Total evidence records across all tasks",
        )
        .expect("metric can be created");

        // Register all metrics.
        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(users_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(customers_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(sites_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(work_orders_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(tasks_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(visits_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(evidence_records_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                users_total,
                customers_total,
                sites_total,
                work_orders_total,
                tasks_total,
                visits_total,
                evidence_records_total,
            }),
        }
    }

    /// Return current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        let families = self.inner.http_requests_total.collect();
        for mf in &families {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Return current total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        let mut total = 0u64;
        let families = self.inner.http_errors_total.collect();
        for mf in &families {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Domain gauge accessors (used by the /metrics handler) --

    /// Access the users gauge for updating.
    pub fn users_total(&self) -> &Gauge {
        &self.inner.users_total
    }

    /// Access the customers gauge for updating.
    pub fn customers_total(&self) -> &Gauge {
        &self.inner.customers_total
    }

    /// Access the sites gauge for updating.
    pub fn sites_total(&self) -> &Gauge {
        &self.inner.sites_total
    }

    /// Access the work orders gauge for updating.
    pub fn work_orders_total(&self) -> &GaugeVec {
        &self.inner.work_orders_total
    }

    /// Access the tasks gauge for updating.
    pub fn tasks_total(&self) -> &GaugeVec {
        &self.inner.tasks_total
    }

    /// Access the visits gauge for updating.
    pub fn visits_total(&self) -> &GaugeVec {
        &self.inner.visits_total
    }

    /// Access the evidence records gauge for updating.
    pub fn evidence_records_total(&self) -> &Gauge {
        &self.inner.evidence_records_total
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a request path by replacing UUID segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels. UUIDs are detected
/// as 32-hex-char strings with optional hyphens (standard UUID format).
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            // Match standard UUID: 8-4-4-4-12 hex chars with hyphens
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else if segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                // UUID without hyphens
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn requests_increments() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(m.requests(), 1);
        m.record_request("POST", "/test", 201, 0.02);
        m.record_request("GET", "/other", 200, 0.005);
        assert_eq!(m.requests(), 3);
    }

    #[test]
    fn errors_increments() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 500, 0.1);
        assert_eq!(m.errors(), 1);
        m.record_request("GET", "/test", 404, 0.05);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn request_and_error_counts_independent() {
        let m = ApiMetrics::new();
        for _ in 0..5 {
            m.record_request("GET", "/ok", 200, 0.01);
        }
        m.record_request("GET", "/fail", 500, 0.1);
        m.record_request("POST", "/fail", 422, 0.05);
        assert_eq!(m.requests(), 7);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn concurrent_increments_are_safe() {
        let m = ApiMetrics::new();
        let threads: Vec<_> = (0..10)
            .map(|_| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        m.record_request("GET", "/test", 200, 0.001);
                        m.record_request("GET", "/err", 500, 0.001);
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(m.requests(), 20_000);
        assert_eq!(m.errors(), 10_000);
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let m = ApiMetrics::new();
        let clone = m.clone();

        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(clone.requests(), 1, "clone should see the same counter");

        clone.record_request("GET", "/err", 500, 0.01);
        assert_eq!(m.errors(), 1, "original should see clone's increment");
    }

    #[test]
    fn gather_and_encode_produces_text() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 200, 0.01);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("fos_http_requests_total"));
        assert!(output.contains("fos_http_request_duration_seconds"));
    }

    #[test]
    fn normalize_path_replaces_uuid_with_hyphens() {
        let path = "/v1/visits/550e8400-e29b-41d4-a716-446655440000/closeout-gate";
        assert_eq!(normalize_path(path), "/v1/visits/{id}/closeout-gate");
    }

    #[test]
    fn normalize_path_replaces_uuid_without_hyphens() {
        let path = "/v1/tasks/550e8400e29b41d4a716446655440000";
        assert_eq!(normalize_path(path), "/v1/tasks/{id}");
    }

    #[test]
    fn normalize_path_preserves_non_uuid_segments() {
        let path = "/v1/work-orders";
        assert_eq!(normalize_path(path), "/v1/work-orders");
    }

    #[test]
    fn normalize_path_multiple_uuids() {
        let path = "/v1/tasks/550e8400-e29b-41d4-a716-446655440000/evidence/660e8400-e29b-41d4-a716-446655440001";
        assert_eq!(normalize_path(path), "/v1/tasks/{id}/evidence/{id}");
    }

    #[test]
    fn domain_gauges_update() {
        let m = ApiMetrics::new();
        m.work_orders_total().with_label_values(&["OPEN"]).set(3.0);
        m.visits_total().with_label_values(&["SCHEDULED"]).set(2.0);
        m.customers_total().set(7.0);
        m.evidence_records_total().set(42.0);

        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("fos_work_orders_total"));
        assert!(output.contains("fos_customers_total"));
        assert!(output.contains("fos_evidence_records_total"));
    }
}
