use std::collections::HashMap;

use dispatcher_core::registry::Algorithm;
use integration_tests::harness::{MockWorker, TestServer, worker_spec};

/// Spec §8 S4 — three healthy, equal-weight workers under `round-robin`
/// split 9 requests three ways, each receiving exactly 3.
#[tokio::test]
async fn round_robin_splits_requests_evenly() {
    let w1 = MockWorker::start().await;
    let w2 = MockWorker::start().await;
    let w3 = MockWorker::start().await;
    let specs = vec![
        worker_spec("w1", &w1, 1),
        worker_spec("w2", &w2, 1),
        worker_spec("w3", &w3, 1),
    ];
    let server = TestServer::start(specs, Algorithm::RoundRobin).await;

    let mut counts: HashMap<String, u32> = HashMap::new();
    for _ in 0..9 {
        let resp = server
            .client
            .post(server.url("/task"))
            .json(&serde_json::json!({"id": "t", "weight": 1.0}))
            .send()
            .await
            .expect("request failed");
        let body: serde_json::Value = resp.json().await.unwrap();
        let worker = body["worker"].as_str().unwrap().to_string();
        *counts.entry(worker).or_default() += 1;
    }

    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|&c| c == 3), "counts: {counts:?}");
}
