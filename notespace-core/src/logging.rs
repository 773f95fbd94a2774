//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber on stderr so stdout stays free for JSON output.
///
/// `RUST_LOG` takes precedence over `default_level`. A subscriber installed
/// earlier (by a test harness or an embedding host) is left in place.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(default_level, "tracing initialized");
    }
}
