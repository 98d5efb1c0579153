use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::registry::Registry;

/// Bounded per-subscriber queue depth. A subscriber that can't keep up is
/// dropped rather than allowed to back-pressure the broadcaster (spec §4.6).
const SUBSCRIBER_QUEUE_DEPTH: usize = 16;

/// Identifies one push-stream subscriber, for `unsubscribe` and for
/// tracing fields when a client is dropped.
pub type SubscriberId = Uuid;

/// Fans out serialized `Snapshot`s to every subscribed push-stream client.
/// The subscriber set is guarded by a mutex distinct from the Registry's
/// structural lock so a slow writer never stalls registry mutations or the
/// hot forwarding path (spec §4.6, §5).
pub struct Broadcaster {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<String>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a client and immediately sends it one snapshot, per spec
    /// §6's push-stream protocol. Returns the subscriber id (for
    /// `unsubscribe`) and the receiving half of its send queue.
    pub fn subscribe(&self, registry: &Registry) -> (SubscriberId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let _ = tx.try_send(Self::encode(registry));

        let id = Uuid::new_v4();
        self.subscribers.lock().unwrap().insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.lock().unwrap().remove(&id);
    }

    /// Serializes the registry's current snapshot once and pushes it to
    /// every subscriber's queue. A subscriber whose queue is full or whose
    /// receiver has been dropped is removed.
    pub fn broadcast(&self, registry: &Registry) {
        let payload = Self::encode(registry);
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|_, tx| tx.try_send(payload.clone()).is_ok());
    }

    /// Alias used by state-changing operations (`SetAlgorithm`,
    /// `UpdateWorker`, a completed `/task`) to request an out-of-band
    /// broadcast, per spec §4.6.
    pub fn request_broadcast(&self, registry: &Registry) {
        self.broadcast(registry);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    fn encode(registry: &Registry) -> String {
        serde_json::to_string(&registry.snapshot())
            .expect("Snapshot contains no non-serializable fields")
    }

    /// Drives the periodic tick (default 1s per spec §4.6) until `cancel` is
    /// triggered. Runs forever otherwise; intended to be spawned as a
    /// background task alongside the health prober.
    pub async fn run(&self, registry: &Registry, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => self.broadcast(registry),
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Algorithm, WorkerSpec};
    use std::time::Duration as StdDuration;

    fn registry() -> Registry {
        Registry::new(
            vec![WorkerSpec {
                name: "w1".into(),
                url: "http://w1".into(),
                color: "#fff".into(),
                weight: 1,
                max_load: 10,
            }],
            Algorithm::RoundRobin,
            3,
            StdDuration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn subscribe_sends_one_snapshot_immediately() {
        let b = Broadcaster::new();
        let r = registry();
        let (_id, mut rx) = b.subscribe(&r);
        let frame = rx.try_recv().expect("initial snapshot");
        assert!(frame.contains("\"algorithm\""));
    }

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers() {
        let b = Broadcaster::new();
        let r = registry();
        let (_id1, mut rx1) = b.subscribe(&r);
        let (_id2, mut rx2) = b.subscribe(&r);
        rx1.try_recv().unwrap();
        rx2.try_recv().unwrap();

        b.broadcast(&r);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unsubscribe_removes_the_client() {
        let b = Broadcaster::new();
        let r = registry();
        let (id, _rx) = b.subscribe(&r);
        assert_eq!(b.subscriber_count(), 1);
        b.unsubscribe(id);
        assert_eq!(b.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_the_subscriber() {
        let b = Broadcaster::new();
        let r = registry();
        let (_id, rx) = b.subscribe(&r);
        // Fill the queue without draining it.
        for _ in 0..(SUBSCRIBER_QUEUE_DEPTH + 2) {
            b.broadcast(&r);
        }
        assert_eq!(b.subscriber_count(), 0, "slow subscriber should be dropped");
        drop(rx);
    }
}
