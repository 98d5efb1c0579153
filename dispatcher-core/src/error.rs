use thiserror::Error;

/// Errors that can occur while assembling configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL in {key}: {source}")]
    InvalidUrl {
        key: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid LB_ALGORITHM value '{value}'")]
    InvalidAlgorithm { value: String },

    #[error("invalid PORT value '{value}'")]
    InvalidPort { value: String },

    #[error("invalid weight in {key}: '{value}' is not a non-negative integer")]
    InvalidWeight { key: String, value: String },

    #[error("no workers configured: at least one WORKER_*_URL must be set")]
    NoWorkers,
}

/// Errors surfaced by registry mutations and the dispatch path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown worker '{0}'")]
    UnknownWorker(String),

    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("No healthy workers available")]
    NoWorkersAvailable,
}
