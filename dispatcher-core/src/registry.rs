use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::circuit::CircuitTracker;
use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    RoundRobin,
    LeastConnections,
    Weighted,
    Random,
}

impl Algorithm {
    /// The four strategies a client can switch to via `/algorithm` (spec §6).
    pub const ALL: [Algorithm; 4] = [
        Algorithm::RoundRobin,
        Algorithm::LeastConnections,
        Algorithm::Weighted,
        Algorithm::Random,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "round-robin" => Some(Algorithm::RoundRobin),
            "least-connections" => Some(Algorithm::LeastConnections),
            "weighted" => Some(Algorithm::Weighted),
            "random" => Some(Algorithm::Random),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "round-robin",
            Algorithm::LeastConnections => "least-connections",
            Algorithm::Weighted => "weighted",
            Algorithm::Random => "random",
        }
    }
}

/// Structural, operator-mutable fields of a worker. Guarded by a dedicated
/// `RwLock` so algorithm/enable/weight changes never contend with the hot
/// counter path (spec §4.1, §5).
#[derive(Debug, Clone)]
struct WorkerState {
    enabled: bool,
    weight: u32,
}

/// RAII guard released on drop so `currentLoad` is decremented on every
/// exit path out of the forwarding path, including early returns and panics.
pub struct LoadGuard<'a> {
    worker: &'a Worker,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let prev = self.worker.current_load.fetch_sub(1, Ordering::AcqRel);
        if prev == 0 {
            // Defensive: a bug elsewhere double-released a guard. Never let
            // the counter wrap into a huge u32 and corrupt `least-connections`.
            self.worker.current_load.store(0, Ordering::Release);
        }
    }
}

#[derive(Debug)]
pub struct Worker {
    pub name: String,
    pub url: String,
    pub color: String,
    pub max_load: u32,
    state: RwLock<WorkerState>,
    current_load: AtomicU32,
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    pub circuit: CircuitTracker,
}

impl Worker {
    fn new(
        name: String,
        url: String,
        color: String,
        weight: u32,
        max_load: u32,
        circuit_threshold: u32,
        circuit_recovery: Duration,
    ) -> Self {
        Self {
            name,
            url,
            color,
            max_load,
            state: RwLock::new(WorkerState {
                enabled: true,
                weight,
            }),
            current_load: AtomicU32::new(0),
            total_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            circuit: CircuitTracker::new(circuit_threshold, circuit_recovery),
        }
    }

    pub fn enabled(&self) -> bool {
        self.state.read().unwrap().enabled
    }

    pub fn weight(&self) -> u32 {
        self.state.read().unwrap().weight
    }

    pub fn current_load(&self) -> u32 {
        self.current_load.load(Ordering::Acquire)
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Acquire)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Acquire)
    }

    /// A worker is eligible for selection iff enabled, healthy, and its
    /// circuit is closed. This is a derived view; clients never write it.
    pub fn is_eligible(&self) -> bool {
        self.enabled() && self.circuit.healthy() && !self.circuit.is_open()
    }

    /// Marks the start of a forward: increments `currentLoad` and
    /// `totalRequests` exactly once, and returns a guard that decrements
    /// `currentLoad` exactly once when dropped.
    pub fn begin_forward(&self) -> LoadGuard<'_> {
        self.current_load.fetch_add(1, Ordering::AcqRel);
        self.total_requests.fetch_add(1, Ordering::AcqRel);
        LoadGuard { worker: self }
    }

    pub fn record_failed_request(&self) {
        self.failed_requests.fetch_add(1, Ordering::AcqRel);
    }

    fn set_enabled(&self, enabled: bool) {
        self.state.write().unwrap().enabled = enabled;
    }

    /// Non-positive weights are ignored, preserving the previous weight.
    fn set_weight(&self, weight: i64) {
        if weight > 0 {
            self.state.write().unwrap().weight = weight as u32;
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerView {
    pub name: String,
    pub url: String,
    pub color: String,
    pub weight: u32,
    pub max_load: u32,
    pub healthy: bool,
    pub current_load: u32,
    pub enabled: bool,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub circuit_open: bool,
}

impl From<&Arc<Worker>> for WorkerView {
    fn from(w: &Arc<Worker>) -> Self {
        WorkerView {
            name: w.name.clone(),
            url: w.url.clone(),
            color: w.color.clone(),
            weight: w.weight(),
            max_load: w.max_load,
            healthy: w.circuit.healthy(),
            current_load: w.current_load(),
            enabled: w.enabled(),
            total_requests: w.total_requests(),
            failed_requests: w.failed_requests(),
            circuit_open: w.circuit.is_open(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub algorithm: &'static str,
    pub workers: Vec<WorkerView>,
}

/// Owns the canonical, ordered list of workers and the mutable operational
/// fields described in spec §3. Workers are created at startup and live for
/// the process lifetime; there is no runtime add/remove.
#[derive(Debug)]
pub struct Registry {
    workers: Vec<Arc<Worker>>,
    algorithm: ArcSwap<Algorithm>,
    round_robin_cursor: AtomicU64,
    pub circuit_threshold: u32,
    pub circuit_recovery: Duration,
}

/// Startup description of a worker; see `dispatcher_core::config`.
pub struct WorkerSpec {
    pub name: String,
    pub url: String,
    pub color: String,
    pub weight: u32,
    pub max_load: u32,
}

impl Registry {
    pub fn new(
        specs: Vec<WorkerSpec>,
        initial_algorithm: Algorithm,
        circuit_threshold: u32,
        circuit_recovery: Duration,
    ) -> Self {
        let workers = specs
            .into_iter()
            .map(|s| {
                Arc::new(Worker::new(
                    s.name,
                    s.url,
                    s.color,
                    s.weight,
                    s.max_load,
                    circuit_threshold,
                    circuit_recovery,
                ))
            })
            .collect();

        Self {
            workers,
            algorithm: ArcSwap::from_pointee(initial_algorithm),
            round_robin_cursor: AtomicU64::new(0),
            circuit_threshold,
            circuit_recovery,
        }
    }

    pub fn workers(&self) -> &[Arc<Worker>] {
        &self.workers
    }

    pub fn find(&self, name: &str) -> Option<&Arc<Worker>> {
        self.workers.iter().find(|w| w.name == name)
    }

    /// Same as `find`, but shaped for call sites (HTTP handlers) that need
    /// the typed absence error rather than an `Option` to map to 404.
    pub fn worker_or_err(&self, name: &str) -> Result<&Arc<Worker>, DispatchError> {
        self.find(name)
            .ok_or_else(|| DispatchError::UnknownWorker(name.to_string()))
    }

    pub fn algorithm(&self) -> Algorithm {
        **self.algorithm.load()
    }

    /// Accepts only the four known algorithm names.
    pub fn set_algorithm(&self, name: &str) -> Result<Algorithm, DispatchError> {
        let algo =
            Algorithm::parse(name).ok_or_else(|| DispatchError::UnknownAlgorithm(name.into()))?;
        self.algorithm.store(Arc::new(algo));
        Ok(algo)
    }

    /// `weight` updates only if strictly positive; `enabled` updates
    /// unconditionally when provided. Returns `true` if the worker exists.
    pub fn update_worker(&self, name: &str, enabled: Option<bool>, weight: Option<i64>) -> bool {
        let Some(worker) = self.find(name) else {
            return false;
        };
        if let Some(enabled) = enabled {
            worker.set_enabled(enabled);
        }
        if let Some(weight) = weight {
            worker.set_weight(weight);
        }
        true
    }

    pub fn eligible_workers(&self) -> Vec<Arc<Worker>> {
        self.workers
            .iter()
            .filter(|w| w.is_eligible())
            .cloned()
            .collect()
    }

    /// Returns the next round-robin cursor value, unbounded and monotonic;
    /// callers reduce it modulo the worker count.
    pub fn next_round_robin_cursor(&self) -> u64 {
        self.round_robin_cursor.fetch_add(1, Ordering::AcqRel)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            algorithm: self.algorithm().as_str(),
            workers: self.workers.iter().map(WorkerView::from).collect(),
        }
    }
}
