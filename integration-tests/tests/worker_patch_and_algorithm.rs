use dispatcher_core::registry::Algorithm;
use integration_tests::harness::{MockWorker, TestServer, worker_spec};

/// `PATCH /workers/{name}` updates `enabled`/`weight` in place, rejects
/// unknown names with 404, and a non-positive weight is silently ignored
/// (spec §4.1's `UpdateWorker` contract).
#[tokio::test]
async fn patch_worker_updates_enabled_and_weight() {
    let worker = MockWorker::start().await;
    let spec = worker_spec("w1", &worker, 1);
    let server = TestServer::start(vec![spec], Algorithm::RoundRobin).await;

    let resp = server
        .client
        .patch(server.url("/workers/w1"))
        .json(&serde_json::json!({"enabled": false, "weight": 7}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);

    let w1 = server.registry.find("w1").unwrap();
    assert!(!w1.enabled());
    assert_eq!(w1.weight(), 7);

    // Non-positive weight is ignored, preserving the previous value.
    let resp = server
        .client
        .patch(server.url("/workers/w1"))
        .json(&serde_json::json!({"weight": 0}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);
    assert_eq!(w1.weight(), 7);
}

#[tokio::test]
async fn patch_unknown_worker_returns_404() {
    let server = TestServer::start(vec![], Algorithm::RoundRobin).await;

    let resp = server
        .client
        .patch(server.url("/workers/ghost"))
        .json(&serde_json::json!({"enabled": true}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 404);
}

/// `GET /algorithm` reports the current mode and the four switchable
/// strategy names; `PUT` and `POST` both switch it, and an unknown name
/// is rejected with 400 without mutating state (spec §6, §7, §9's "both
/// variants" note).
#[tokio::test]
async fn algorithm_endpoint_reports_and_switches_mode() {
    let worker = MockWorker::start().await;
    let spec = worker_spec("w1", &worker, 1);
    let server = TestServer::start(vec![spec], Algorithm::RoundRobin).await;

    let resp = server.client.get(server.url("/algorithm")).send().await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["algorithm"], "round-robin");
    assert_eq!(
        body["available"],
        serde_json::json!(["round-robin", "least-connections", "weighted", "random"])
    );

    let resp = server
        .client
        .post(server.url("/algorithm"))
        .json(&serde_json::json!({"algorithm": "weighted"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(server.registry.algorithm(), Algorithm::Weighted);

    let resp = server
        .client
        .put(server.url("/algorithm"))
        .json(&serde_json::json!({"algorithm": "bogus"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(server.registry.algorithm(), Algorithm::Weighted);
}

/// `/workers/{name}/config` transparently proxies to the worker's own
/// `/config`, tagging the GET response with `worker` (spec §6).
#[tokio::test]
async fn config_proxy_round_trips_to_worker() {
    let worker = MockWorker::start().await;
    let spec = worker_spec("w1", &worker, 1);
    let server = TestServer::start(vec![spec], Algorithm::RoundRobin).await;

    let resp = server.client.get(server.url("/workers/w1/config")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["setting"], "value");
    assert_eq!(body["worker"], "w1");

    let resp = server
        .client
        .put(server.url("/workers/w1/config"))
        .json(&serde_json::json!({"setting": "new"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn config_proxy_unknown_worker_returns_404() {
    let server = TestServer::start(vec![], Algorithm::RoundRobin).await;
    let resp = server.client.get(server.url("/workers/ghost/config")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}
