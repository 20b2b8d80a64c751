use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Parse-drift warnings go to stderr so
/// the CLI's JSON document on stdout stays machine-readable; release
/// builds emit JSON lines for log shippers. `RUST_LOG` overrides the
/// default filter.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("droid_triage=info"));

    if cfg!(debug_assertions) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init();
    }
}
