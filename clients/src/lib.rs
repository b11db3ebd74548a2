//! Shared setup for the `fml-*` command-line clients.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber; `verbose` is the number of `-v`
/// flags. `RUST_LOG`, when set, takes precedence.
pub fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn,fairmodels_engine=info,fairmodels_validation=info",
        1 => "warn,fairmodels_engine=debug,fairmodels_validation=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
