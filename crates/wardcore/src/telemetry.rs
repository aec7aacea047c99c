//! Structured logging setup.

/// Initializes a `tracing_subscriber` formatter honoring `RUST_LOG`,
/// defaulting to `INFO` when unset. Call once, near process start.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}
