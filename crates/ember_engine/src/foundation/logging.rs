//! Logging initialization

/// Initialize the global logger from the `RUST_LOG` environment variable,
/// defaulting to `info` level.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}
