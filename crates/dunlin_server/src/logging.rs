//! Tracing setup for the server process.

use tracing_subscriber::filter::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// The filter honors `DUNLIN_LOG` (e.g. `DUNLIN_LOG=dunlin_server=trace`)
/// and defaults to `info`. Logs go to stderr so stdout stays free for the
/// protocol stream.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("DUNLIN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Err(error) = result {
        tracing::debug!("Tracing subscriber was already initialized: {error}");
    }
}
