use std::sync::Arc;
use std::time::Duration;

use dispatcher::state::AppState;
use dispatcher_core::broadcaster::Broadcaster;
use dispatcher_core::metrics::Metrics;
use dispatcher_core::registry::{Algorithm, Registry, WorkerSpec};

/// A running dispatcher instance bound to an ephemeral port, wired the same
/// way `dispatcher::main` wires it but without reading the environment —
/// tests build their `WorkerSpec`s directly so parallel test runs never
/// contend on process-global env vars (spec §6's `WORKER_*_URL` surface is
/// covered separately by `dispatcher-core::config`'s own unit tests).
pub struct TestServer {
    base_url: String,
    pub client: reqwest::Client,
    pub registry: Arc<Registry>,
    pub broadcaster: Arc<Broadcaster>,
}

impl TestServer {
    pub async fn start(workers: Vec<WorkerSpec>, algorithm: Algorithm) -> Self {
        let registry = Arc::new(Registry::new(workers, algorithm, 3, Duration::from_secs(30)));
        let metrics = Arc::new(Metrics::new());
        let broadcaster = Arc::new(Broadcaster::new());
        let state = AppState::new(registry.clone(), metrics.clone(), broadcaster.clone());

        let app = dispatcher::http::router(state, &[]);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind dispatcher test server");
        let addr = listener.local_addr().expect("local_addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("dispatcher test server crashed");
        });

        let base_url = format!("http://{addr}");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url,
            client,
            registry,
            broadcaster,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.base_url.strip_prefix("http://").unwrap())
    }
}
