use std::sync::Arc;

use crate::registry::{Registry, Worker};
use crate::selector::SelectionStrategy;

/// Atomically increments a cursor, then scans the *full* registered worker
/// list starting at `cursor mod N`, returning the first eligible worker.
/// Scanning the full list (not just the eligible subset) and checking
/// eligibility inline means a worker flipping ineligible mid-scan is simply
/// skipped, never crashes the selection.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl SelectionStrategy for RoundRobin {
    fn select(&self, registry: &Registry, _eligible: &[Arc<Worker>]) -> Option<Arc<Worker>> {
        let all = registry.workers();
        let n = all.len();
        if n == 0 {
            return None;
        }

        let start = (registry.next_round_robin_cursor() % n as u64) as usize;
        for offset in 0..n {
            let idx = (start + offset) % n;
            if all[idx].is_eligible() {
                return Some(all[idx].clone());
            }
        }
        None
    }
}
