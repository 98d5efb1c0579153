use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Reference instant the process started; used to store "opened at" as a
/// lock-free millisecond offset instead of an `Instant` (which has no atomic
/// representation).
static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Per-worker health/circuit state, per spec: `ProbeOk`/`ForwardOk` are
/// equivalent success signals, `ProbeFail`/`ForwardFail` are equivalent
/// failure signals, and they feed one `consecFailures` counter.
///
/// Recovery is timer-based (the `circuitRecovery` variant from the design
/// notes): once open, the breaker stays sticky until `recovery` has elapsed
/// since it tripped, at which point it is lazily reset back to closed the
/// next time anyone asks about its state. This is deliberately the simpler
/// of the two documented recovery mechanisms — see DESIGN.md.
#[derive(Debug)]
pub struct CircuitTracker {
    healthy: AtomicBool,
    circuit_open: AtomicBool,
    consec_failures: AtomicU32,
    /// Milliseconds since `START` that the breaker tripped; 0 means "not open".
    opened_at_ms: AtomicU64,
    threshold: u32,
    recovery: Duration,
}

impl CircuitTracker {
    pub fn new(threshold: u32, recovery: Duration) -> Self {
        Self {
            healthy: AtomicBool::new(true),
            circuit_open: AtomicBool::new(false),
            consec_failures: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            threshold: threshold.max(1),
            recovery,
        }
    }

    pub fn healthy(&self) -> bool {
        self.poll_recovery();
        self.healthy.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.poll_recovery();
        self.circuit_open.load(Ordering::Acquire)
    }

    pub fn consec_failures(&self) -> u32 {
        self.consec_failures.load(Ordering::Acquire)
    }

    /// Any success (probe or forward) fully restores the worker.
    pub fn record_success(&self, worker: &str) {
        self.consec_failures.store(0, Ordering::Release);
        self.healthy.store(true, Ordering::Release);
        let was_open = self.circuit_open.swap(false, Ordering::AcqRel);
        if was_open {
            self.opened_at_ms.store(0, Ordering::Release);
            tracing::info!(
                event = "circuit_transition",
                worker,
                to = "closed",
                reason = "success_observed"
            );
        }
    }

    /// Any failure (probe or forward) increments the shared counter and
    /// trips the breaker once `threshold` consecutive failures accumulate.
    pub fn record_failure(&self, worker: &str) {
        self.poll_recovery();
        if self.circuit_open.load(Ordering::Acquire) {
            // Sticky until a success is observed; additional failures
            // while open don't matter (no requests should be reaching it).
            return;
        }

        let failures = self.consec_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.threshold {
            self.healthy.store(false, Ordering::Release);
            self.circuit_open.store(true, Ordering::Release);
            self.opened_at_ms
                .store(START.elapsed().as_millis() as u64, Ordering::Release);
            tracing::info!(
                event = "circuit_transition",
                worker,
                to = "open",
                reason = "failure_threshold_exceeded",
                consecutive_failures = failures
            );
        }
    }

    fn poll_recovery(&self) {
        if !self.circuit_open.load(Ordering::Acquire) {
            return;
        }
        let opened = self.opened_at_ms.load(Ordering::Acquire);
        if opened == 0 {
            return;
        }
        let now_ms = START.elapsed().as_millis() as u64;
        if now_ms.saturating_sub(opened) < self.recovery.as_millis() as u64 {
            return;
        }

        // Only the caller that wins the CAS performs the transition and logs it.
        if self
            .circuit_open
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.consec_failures.store(0, Ordering::Release);
            self.healthy.store(true, Ordering::Release);
            self.opened_at_ms.store(0, Ordering::Release);
            tracing::info!(
                event = "circuit_transition",
                to = "closed",
                reason = "recovery_timer_elapsed"
            );
        }
    }
}
