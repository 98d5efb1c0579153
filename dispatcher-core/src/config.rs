use std::time::Duration;

use crate::error::ConfigError;
use crate::registry::{Algorithm, WorkerSpec};

/// The well-known worker slots the dispatcher recognizes. Each slot maps to
/// an `<PREFIX>_URL` / `<PREFIX>_WEIGHT` environment variable pair (spec
/// §6); a slot with no URL set is simply omitted from the registry.
struct WorkerSlot {
    name: &'static str,
    env_prefix: &'static str,
    color: &'static str,
}

const WORKER_SLOTS: &[WorkerSlot] = &[
    WorkerSlot { name: "go-1", env_prefix: "WORKER_GO_1", color: "#00ADD8" },
    WorkerSlot { name: "go-2", env_prefix: "WORKER_GO_2", color: "#00758F" },
    WorkerSlot { name: "python-1", env_prefix: "WORKER_PYTHON_1", color: "#3776AB" },
    WorkerSlot { name: "node-1", env_prefix: "WORKER_NODE_1", color: "#339933" },
];

const DEFAULT_MAX_LOAD: u32 = 100;
const DEFAULT_CIRCUIT_THRESHOLD: u32 = 3;
const DEFAULT_CIRCUIT_RECOVERY: Duration = Duration::from_secs(30);
const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Assembled startup configuration, read directly from the process
/// environment per spec §6 (no config file layer for this service).
pub struct DispatcherConfig {
    pub port: u16,
    pub algorithm: Algorithm,
    pub allowed_origins: Vec<String>,
    pub workers: Vec<WorkerSpec>,
    pub circuit_threshold: u32,
    pub circuit_recovery: Duration,
    pub health_interval: Duration,
}

impl DispatcherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(v) => v
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { value: v })?,
            Err(_) => 8000,
        };

        let algorithm = match std::env::var("LB_ALGORITHM") {
            Ok(v) => Algorithm::parse(&v).ok_or(ConfigError::InvalidAlgorithm { value: v })?,
            Err(_) => Algorithm::RoundRobin,
        };

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let workers = Self::workers_from_env()?;
        if workers.is_empty() {
            return Err(ConfigError::NoWorkers);
        }

        Ok(Self {
            port,
            algorithm,
            allowed_origins,
            workers,
            circuit_threshold: DEFAULT_CIRCUIT_THRESHOLD,
            circuit_recovery: DEFAULT_CIRCUIT_RECOVERY,
            health_interval: DEFAULT_HEALTH_INTERVAL,
        })
    }

    fn workers_from_env() -> Result<Vec<WorkerSpec>, ConfigError> {
        let mut specs = Vec::new();
        for slot in WORKER_SLOTS {
            let url_key = format!("{}_URL", slot.env_prefix);
            let Ok(url) = std::env::var(&url_key) else {
                continue;
            };

            url::Url::parse(&url).map_err(|source| ConfigError::InvalidUrl {
                key: url_key,
                source,
            })?;

            let weight_key = format!("{}_WEIGHT", slot.env_prefix);
            let weight = match std::env::var(&weight_key) {
                Ok(v) => v
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidWeight { key: weight_key, value: v })?,
                Err(_) => 1,
            };

            specs.push(WorkerSpec {
                name: slot.name.to_string(),
                url,
                color: slot.color.to_string(),
                weight,
                max_load: DEFAULT_MAX_LOAD,
            });
        }
        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable mutation must be serialized across tests in this
    // process; std::env is process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for slot in WORKER_SLOTS {
            unsafe {
                std::env::remove_var(format!("{}_URL", slot.env_prefix));
                std::env::remove_var(format!("{}_WEIGHT", slot.env_prefix));
            }
        }
        unsafe {
            std::env::remove_var("PORT");
            std::env::remove_var("LB_ALGORITHM");
            std::env::remove_var("ALLOWED_ORIGINS");
        }
    }

    #[test]
    fn missing_url_omits_worker() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("WORKER_GO_1_URL", "http://localhost:9001");
        }
        let cfg = DispatcherConfig::from_env().expect("config");
        assert_eq!(cfg.workers.len(), 1);
        assert_eq!(cfg.workers[0].name, "go-1");
        clear_env();
    }

    #[test]
    fn no_workers_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        assert!(matches!(
            DispatcherConfig::from_env(),
            Err(ConfigError::NoWorkers)
        ));
    }

    #[test]
    fn weight_override_applies_only_to_its_worker() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("WORKER_GO_1_URL", "http://localhost:9001");
            std::env::set_var("WORKER_GO_1_WEIGHT", "5");
            std::env::set_var("WORKER_NODE_1_URL", "http://localhost:9002");
        }
        let cfg = DispatcherConfig::from_env().expect("config");
        let go1 = cfg.workers.iter().find(|w| w.name == "go-1").unwrap();
        let node1 = cfg.workers.iter().find(|w| w.name == "node-1").unwrap();
        assert_eq!(go1.weight, 5);
        assert_eq!(node1.weight, 1);
        clear_env();
    }

    #[test]
    fn invalid_algorithm_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("WORKER_GO_1_URL", "http://localhost:9001");
            std::env::set_var("LB_ALGORITHM", "bogus");
        }
        assert!(matches!(
            DispatcherConfig::from_env(),
            Err(ConfigError::InvalidAlgorithm { .. })
        ));
        clear_env();
    }
}
