use std::sync::Arc;

use rand::Rng;

use crate::registry::{Registry, Worker};
use crate::selector::SelectionStrategy;

/// Draws `r` uniformly from `[0, W)` where `W` is the sum of eligible
/// weights, then walks the eligible list subtracting each weight from `r`
/// until it goes negative. Falls back to the first eligible worker when
/// `W == 0` (every eligible worker has weight zero).
#[derive(Debug, Default)]
pub struct Weighted;

impl SelectionStrategy for Weighted {
    fn select(&self, _registry: &Registry, eligible: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        if eligible.is_empty() {
            return None;
        }

        let total: u64 = eligible.iter().map(|w| w.weight() as u64).sum();
        if total == 0 {
            return eligible.first().cloned();
        }

        let mut r = rand::rng().random_range(0..total) as i64;
        for w in eligible {
            r -= w.weight() as i64;
            if r < 0 {
                return Some(w.clone());
            }
        }

        // Unreachable given the draw is bounded by `total`, but keep the
        // selection total rather than panicking on a rounding edge case.
        eligible.last().cloned()
    }
}
