/// Logging initialization: tracing-subscriber fmt → stderr, overridable with
/// `RUST_LOG`.
///
/// Called once at the start of `ChatApp::new()`; `try_init` makes repeated
/// calls (embedding hosts, tests spawning several apps) harmless.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lanchat_core=debug,info".into()),
        )
        .try_init();
}
