use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus collectors for the four metrics spec.md §6 requires. Uses the
/// `prometheus` crate (already present in the retrieval pack) rather than
/// hand-formatted text, per SPEC_FULL.md's ambient-stack note.
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_ms: HistogramVec,
    worker_health: prometheus::GaugeVec,
    worker_active_connections: prometheus::GaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("lb_requests_total", "Total forwarded requests by worker and outcome"),
            &["worker", "status"],
        )
        .expect("valid metric");

        // Exponential buckets starting at 1ms: 1, 2, 4, ..., ~32s.
        let buckets = prometheus::exponential_buckets(1.0, 2.0, 16).expect("valid buckets");
        let request_duration_ms = HistogramVec::new(
            HistogramOpts::new("lb_request_duration_ms", "Forward latency in milliseconds")
                .buckets(buckets),
            &["worker"],
        )
        .expect("valid metric");

        let worker_health = prometheus::GaugeVec::new(
            Opts::new("lb_worker_health", "1 if the worker is healthy, 0 otherwise"),
            &["worker"],
        )
        .expect("valid metric");

        let worker_active_connections = prometheus::GaugeVec::new(
            Opts::new("lb_worker_active_connections", "In-flight forwards per worker"),
            &["worker"],
        )
        .expect("valid metric");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("register lb_requests_total");
        registry
            .register(Box::new(request_duration_ms.clone()))
            .expect("register lb_request_duration_ms");
        registry
            .register(Box::new(worker_health.clone()))
            .expect("register lb_worker_health");
        registry
            .register(Box::new(worker_active_connections.clone()))
            .expect("register lb_worker_active_connections");

        Self {
            registry,
            requests_total,
            request_duration_ms,
            worker_health,
            worker_active_connections,
        }
    }

    pub fn record_request(&self, worker: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.requests_total.with_label_values(&[worker, status]).inc();
    }

    pub fn observe_latency_ms(&self, worker: &str, millis: f64) {
        self.request_duration_ms
            .with_label_values(&[worker])
            .observe(millis);
    }

    pub fn set_worker_health(&self, worker: &str, healthy: bool) {
        self.worker_health
            .with_label_values(&[worker])
            .set(if healthy { 1.0 } else { 0.0 });
    }

    pub fn set_active_connections(&self, worker: &str, active: u32) {
        self.worker_active_connections
            .with_label_values(&[worker])
            .set(active as f64);
    }

    /// Render the current state of all collectors in Prometheus text format.
    pub fn encode(&self) -> String {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .expect("prometheus encoding never fails for well-formed families");
        String::from_utf8(buf).expect("prometheus text encoder emits valid utf8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
