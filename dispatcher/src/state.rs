use std::sync::Arc;
use std::time::Duration;

use dispatcher_core::broadcaster::Broadcaster;
use dispatcher_core::forwarder::Forwarder;
use dispatcher_core::metrics::Metrics;
use dispatcher_core::registry::Registry;

/// Spec §5: the `/workers/{name}/config` proxy honors a 5s timeout.
const CONFIG_PROXY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state wired once at startup and cloned cheaply
/// (everything inside is an `Arc`) into every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
    pub broadcaster: Arc<Broadcaster>,
    pub forwarder: Arc<Forwarder>,
    pub config_proxy_client: reqwest::Client,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, metrics: Arc<Metrics>, broadcaster: Arc<Broadcaster>) -> Self {
        let forwarder = Arc::new(Forwarder::new(registry.clone(), metrics.clone(), broadcaster.clone()));
        let config_proxy_client = reqwest::Client::builder()
            .timeout(CONFIG_PROXY_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout always builds");

        Self {
            registry,
            metrics,
            broadcaster,
            forwarder,
            config_proxy_client,
        }
    }
}
