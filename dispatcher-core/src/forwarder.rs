use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};

use crate::broadcaster::Broadcaster;
use crate::metrics::Metrics;
use crate::registry::Registry;
use crate::selector;

/// Spec §5: forwards honor a 30s request-scoped timeout.
const FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// The inbound `/task` body. Both fields are optional; a body that fails to
/// parse at all is tolerated by substituting the default (spec §4.5 step 3).
#[derive(Debug, Deserialize, Default, Clone)]
pub struct TaskRequest {
    pub id: Option<String>,
    pub weight: Option<f64>,
}

impl TaskRequest {
    /// Parse raw request bytes, falling back to the default task on any
    /// decode failure rather than rejecting the request.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    fn to_worker_body(&self) -> Value {
        json!({
            "id": self.id,
            "weight": self.weight.unwrap_or(1.0),
        })
    }
}

/// Result of dispatching one `/task` request, already shaped for the HTTP
/// surface to turn into a response (spec §4.5, §6, §7).
pub enum ForwardOutcome {
    /// No eligible worker; respond 503 with the fixed error body.
    NoWorkers,
    /// The worker answered with a non-5xx status; `body` is the worker's
    /// JSON (or `{}` on decode failure) augmented with `worker`,
    /// `workerColor`, `processingTimeMs`.
    Success(Value),
    /// Transport error or a 5xx from the worker; respond 503.
    Failure,
}

/// Handles the `/task` request path: select, account, forward, record
/// outcome, trigger a broadcast. This is the hot path and the only place
/// `currentLoad` moves (spec §4.5).
pub struct Forwarder {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
    broadcaster: Arc<Broadcaster>,
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(registry: Arc<Registry>, metrics: Arc<Metrics>, broadcaster: Arc<Broadcaster>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FORWARD_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout always builds");
        Self {
            registry,
            metrics,
            broadcaster,
            client,
        }
    }

    pub async fn dispatch(&self, task: TaskRequest) -> ForwardOutcome {
        let Some(worker) = selector::select(&self.registry) else {
            tracing::warn!(error = %crate::error::DispatchError::NoWorkersAvailable, event = "dispatch_rejected");
            self.metrics.record_request("none", false);
            self.broadcaster.request_broadcast(&self.registry);
            return ForwardOutcome::NoWorkers;
        };

        // Increments currentLoad/totalRequests now; the guard decrements
        // currentLoad exactly once on every exit path, including the early
        // returns below. Dropped explicitly before the final metrics/
        // broadcast calls so they observe the post-decrement load (spec
        // §4.5 steps 7-9 are ordered: decrement, then classify, then
        // broadcast).
        let load_guard = worker.begin_forward();
        self.metrics
            .set_active_connections(&worker.name, worker.current_load());

        let url = format!("{}/task", worker.url.trim_end_matches('/'));
        let started = Instant::now();
        let result = self.client.post(&url).json(&task.to_worker_body()).send().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.metrics.observe_latency_ms(&worker.name, elapsed_ms as f64);

        let outcome = match result {
            Ok(resp) if !resp.status().is_server_error() => {
                let status = resp.status();
                let body: Value = resp.json().await.unwrap_or_else(|_| json!({}));
                let _ = status;
                worker.circuit.record_success(&worker.name);
                self.metrics.record_request(&worker.name, true);
                self.metrics.set_worker_health(&worker.name, true);

                let mut body = body;
                if let Value::Object(map) = &mut body {
                    map.insert("worker".into(), json!(worker.name));
                    map.insert("workerColor".into(), json!(worker.color));
                    map.insert("processingTimeMs".into(), json!(elapsed_ms));
                } else {
                    body = json!({
                        "worker": worker.name,
                        "workerColor": worker.color,
                        "processingTimeMs": elapsed_ms,
                    });
                }
                ForwardOutcome::Success(body)
            }
            _ => {
                worker.record_failed_request();
                worker.circuit.record_failure(&worker.name);
                self.metrics.record_request(&worker.name, false);
                self.metrics
                    .set_worker_health(&worker.name, worker.circuit.healthy());
                ForwardOutcome::Failure
            }
        };

        drop(load_guard);
        self.metrics
            .set_active_connections(&worker.name, worker.current_load());
        self.broadcaster.request_broadcast(&self.registry);
        outcome
    }
}
