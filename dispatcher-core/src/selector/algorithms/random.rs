use std::sync::Arc;

use rand::Rng;

use crate::registry::{Registry, Worker};
use crate::selector::SelectionStrategy;

/// Uniform selection from the eligible set.
#[derive(Debug, Default)]
pub struct Random;

impl SelectionStrategy for Random {
    fn select(&self, _registry: &Registry, eligible: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        if eligible.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..eligible.len());
        eligible.get(idx).cloned()
    }
}
