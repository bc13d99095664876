use tracing_subscriber::EnvFilter;

/// Initialize tracing for the process; filter comes from `RUST_LOG`.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // Subsequent calls are no-ops.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
