mod server;
mod upstream;

use dispatcher_core::registry::WorkerSpec;

pub use server::TestServer;
pub use upstream::MockWorker;

/// Builds the `WorkerSpec` a `TestServer` needs to register a `MockWorker`.
pub fn worker_spec(name: &str, worker: &MockWorker, weight: u32) -> WorkerSpec {
    WorkerSpec {
        name: name.to_string(),
        url: worker.url(),
        color: "#000000".to_string(),
        weight,
        max_load: 100,
    }
}
