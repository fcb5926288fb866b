use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the diagnostic log filter.
pub const LOG_ENV: &str = "OIIO_TESTSUITE_LOG";

/// Send diagnostics to stderr so they never land in compared outputs.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}
