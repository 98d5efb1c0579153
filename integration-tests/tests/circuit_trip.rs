use dispatcher_core::registry::Algorithm;
use integration_tests::harness::{MockWorker, TestServer, worker_spec};

/// Spec §8 S3 — with `circuitThreshold=3`, a worker failing every `/task`
/// trips its breaker on the third consecutive failure and is never
/// selected again while `round-robin` scans past it.
#[tokio::test]
async fn repeated_failures_trip_the_circuit() {
    let bad = MockWorker::start().await;
    bad.set_task_status(500);
    let good1 = MockWorker::start().await;
    let good2 = MockWorker::start().await;

    let specs = vec![
        worker_spec("w1", &bad, 1),
        worker_spec("w2", &good1, 1),
        worker_spec("w3", &good2, 1),
    ];
    let server = TestServer::start(specs, Algorithm::RoundRobin).await;

    // Round-robin starts at w1; drive enough requests that w1 is selected
    // three times and trips open.
    for _ in 0..9 {
        let _ = server
            .client
            .post(server.url("/task"))
            .json(&serde_json::json!({"id": "t", "weight": 1.0}))
            .send()
            .await
            .expect("request failed");
    }

    let w1 = server.registry.find("w1").unwrap();
    assert!(w1.circuit.is_open(), "w1 should have tripped open");
    assert!(!w1.is_eligible());

    // Further requests must never land on w1 again.
    for _ in 0..6 {
        let resp = server
            .client
            .post(server.url("/task"))
            .json(&serde_json::json!({"id": "t", "weight": 1.0}))
            .send()
            .await
            .expect("request failed");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_ne!(body.get("worker").and_then(|v| v.as_str()), Some("w1"));
    }
}
