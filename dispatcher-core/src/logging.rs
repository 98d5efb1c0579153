use tracing_subscriber::{EnvFilter, fmt};

/// Initializes structured logging: JSON-formatted events, level controlled
/// by `RUST_LOG` (falling back to `"info"`), following the teacher's
/// `logging.rs`. When `TOKIO_CONSOLE` is set and the `console` feature is
/// enabled, the tokio-console subscriber is used instead for interactive
/// debugging of the background tasks (prober, broadcaster ticker).
pub fn init_logging() {
    #[cfg(feature = "console")]
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        console_subscriber::init();
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().flatten_event(true).init();
}
