mod algorithms;

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::registry::{Algorithm, Registry, Worker};

pub use algorithms::{LeastConnections, Random, RoundRobin, Weighted};

/// Policy layer over the registry: pick one eligible worker for the current
/// algorithm. Implementations are pure with respect to the eligible-set
/// snapshot they are given, except `RoundRobin` which advances a registry
/// cursor.
pub trait SelectionStrategy: Send + Sync {
    /// `eligible` is the eligible set computed once, under a single
    /// consistent view, by the caller. `registry` is available for
    /// algorithms (round-robin) that need the full worker list or shared
    /// cursors rather than just the eligible subset.
    fn select(&self, registry: &Registry, eligible: &[Arc<Worker>]) -> Option<Arc<Worker>>;
}

static ROUND_ROBIN: Lazy<RoundRobin> = Lazy::new(RoundRobin::default);
static LEAST_CONNECTIONS: Lazy<LeastConnections> = Lazy::new(LeastConnections::default);
static WEIGHTED: Lazy<Weighted> = Lazy::new(Weighted::default);
static RANDOM: Lazy<Random> = Lazy::new(Random::default);

/// Select a worker under the registry's current algorithm. Returns `None`
/// when no worker is eligible; never panics on a worker flipping eligibility
/// mid-selection, because the eligible set is computed once up front.
pub fn select(registry: &Registry) -> Option<Arc<Worker>> {
    let eligible = registry.eligible_workers();
    if eligible.is_empty() {
        return None;
    }

    let strategy: &dyn SelectionStrategy = match registry.algorithm() {
        Algorithm::RoundRobin => &*ROUND_ROBIN,
        Algorithm::LeastConnections => &*LEAST_CONNECTIONS,
        Algorithm::Weighted => &*WEIGHTED,
        Algorithm::Random => &*RANDOM,
    };

    strategy.select(registry, &eligible)
}
