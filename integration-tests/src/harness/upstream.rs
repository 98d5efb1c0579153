use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::{Value, json};

/// Mutable, shared behavior of a mock worker: the status code its `/task`
/// and `/health` endpoints answer with. Tests flip these to drive the
/// dispatcher's circuit breaker and forward-outcome paths (spec §8 S2, S3).
#[derive(Debug)]
pub struct MockWorkerState {
    pub task_status: AtomicU16,
    pub health_status: AtomicU16,
}

impl Default for MockWorkerState {
    fn default() -> Self {
        Self {
            task_status: AtomicU16::new(200),
            health_status: AtomicU16::new(200),
        }
    }
}

/// A tiny in-process worker standing in for spec §1's "black box" backend:
/// it exposes `/health`, `/task`, `/config` just like a real worker would,
/// following the teacher's `harness/upstream.rs` pattern of spinning up a
/// listener per test rather than mocking at the HTTP-client layer.
pub struct MockWorker {
    addr: std::net::SocketAddr,
    pub state: Arc<MockWorkerState>,
}

impl MockWorker {
    pub async fn start() -> Self {
        let state = Arc::new(MockWorkerState::default());

        let app = axum::Router::new()
            .route("/health", get(health))
            .route("/task", post(task))
            .route("/config", get(config).put(config).post(config))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock worker");
        let addr = listener.local_addr().expect("local_addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock worker crashed");
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_task_status(&self, code: u16) {
        self.state.task_status.store(code, Ordering::SeqCst);
    }

    pub fn set_health_status(&self, code: u16) {
        self.state.health_status.store(code, Ordering::SeqCst);
    }
}

async fn health(State(state): State<Arc<MockWorkerState>>) -> StatusCode {
    StatusCode::from_u16(state.health_status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

async fn task(State(state): State<Arc<MockWorkerState>>, body: axum::body::Bytes) -> impl IntoResponse {
    let code = state.task_status.load(Ordering::SeqCst);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
    let id = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .unwrap_or(Value::Null);
    (status, Json(json!({"id": id})))
}

async fn config() -> impl IntoResponse {
    Json(json!({"setting": "value"}))
}
