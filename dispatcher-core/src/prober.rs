use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::metrics::Metrics;
use crate::registry::Registry;

/// Spec §4.4: a short timeout bounds each probe so a wedged worker never
/// blocks a tick.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Periodic background task that drives the Tracker by calling each
/// worker's `/health`. Gates at most one in-flight probe per worker so a
/// slow worker can't accumulate unbounded concurrent probes across ticks
/// (spec §4.4's concurrency contract).
pub struct Prober {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
    client: reqwest::Client,
    in_flight: Vec<Arc<AtomicBool>>,
}

impl Prober {
    pub fn new(registry: Arc<Registry>, metrics: Arc<Metrics>) -> Self {
        let in_flight = registry
            .workers()
            .iter()
            .map(|_| Arc::new(AtomicBool::new(false)))
            .collect();
        Self {
            registry,
            metrics,
            client: reqwest::Client::new(),
            in_flight,
        }
    }

    /// Runs the probe ticker until `cancel` fires. Each tick launches at
    /// most one new probe per worker whose previous probe has already
    /// completed.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => self.tick(),
            }
        }
    }

    fn tick(&self) {
        for (idx, worker) in self.registry.workers().iter().enumerate() {
            let flag = self.in_flight[idx].clone();
            if flag
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // Previous probe for this worker hasn't completed yet; skip
                // this tick for it rather than stacking another in-flight
                // request.
                continue;
            }

            let worker = worker.clone();
            let client = self.client.clone();
            let metrics = self.metrics.clone();
            tokio::spawn(async move {
                let url = format!("{}/health", worker.url.trim_end_matches('/'));
                let ok = match client.get(&url).timeout(PROBE_TIMEOUT).send().await {
                    Ok(resp) => resp.status() == reqwest::StatusCode::OK,
                    Err(_) => false,
                };
                if ok {
                    worker.circuit.record_success(&worker.name);
                } else {
                    worker.circuit.record_failure(&worker.name);
                }
                metrics.set_worker_health(&worker.name, worker.circuit.healthy());
                tracing::debug!(worker = %worker.name, healthy = ok, event = "health_probe");
                flag.store(false, Ordering::Release);
            });
        }
    }
}
