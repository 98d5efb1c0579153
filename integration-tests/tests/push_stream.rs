use std::time::Duration;

use dispatcher_core::registry::Algorithm;
use futures_util::StreamExt;
use integration_tests::harness::TestServer;

/// Spec §8 S6 — on connect the subscriber immediately sees a snapshot
/// whose `algorithm` matches current state, and an algorithm change is
/// reflected within the liveness window.
#[tokio::test]
async fn push_stream_reflects_algorithm_changes() {
    let server = TestServer::start(vec![], Algorithm::RoundRobin).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(server.ws_url())
        .await
        .expect("ws connect failed");

    let first = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("timed out waiting for initial snapshot")
        .expect("stream closed")
        .expect("ws error");
    let first: serde_json::Value = serde_json::from_str(&first.into_text().unwrap()).unwrap();
    assert_eq!(first["algorithm"], "round-robin");

    let resp = server
        .client
        .put(server.url("/algorithm"))
        .json(&serde_json::json!({"algorithm": "least-connections"}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        assert!(remaining > Duration::ZERO, "algorithm change never observed on the stream");

        let frame = tokio::time::timeout(remaining, socket.next())
            .await
            .expect("timed out waiting for updated snapshot")
            .expect("stream closed")
            .expect("ws error");
        let snapshot: serde_json::Value = serde_json::from_str(&frame.into_text().unwrap()).unwrap();
        if snapshot["algorithm"] == "least-connections" {
            break;
        }
    }
}
