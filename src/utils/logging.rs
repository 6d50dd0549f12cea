use tracing_subscriber::EnvFilter;

/// Builds the log filter: `RUST_LOG` when set, otherwise the configured
/// `level`, otherwise `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing/logging for the application.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .try_init();
}
