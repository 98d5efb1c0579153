use std::sync::Arc;

use crate::registry::{Registry, Worker};
use crate::selector::SelectionStrategy;

/// Linear scan of the eligible set, returning the worker with the minimum
/// `currentLoad`. Ties break on first-encountered (registration order),
/// which is exactly what `Iterator::min_by_key` does.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl SelectionStrategy for LeastConnections {
    fn select(&self, _registry: &Registry, eligible: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        eligible.iter().min_by_key(|w| w.current_load()).cloned()
    }
}
