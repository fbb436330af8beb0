//! Logging bootstrap, powered by `tracing-subscriber`.
//!
//! Events go to stderr so that command output on stdout stays clean. The
//! filter starts from `[logging].level`; `RUST_LOG`, when set, replaces it.

use anyhow::Result;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `timestamp LEVEL target: message fields`
    #[default]
    Compact,
    /// JSON lines.
    Json,
}

/// Build the filter for `level`, quieting the HTTP stack below `warn`.
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }
    filter_for_level(level)
}

/// The filter for `level` alone, ignoring `RUST_LOG`.
fn filter_for_level(level: &str) -> Result<EnvFilter> {
    let directives = [level, "hyper=warn", "reqwest=warn", "rustls=warn"].join(",");
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", directives, e))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = build_env_filter(level)?;

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(level, format = ?format, "logging initialized");
    }
    Ok(())
}
