//! Tracing subscriber setup for hosts embedding the browser.

use anyhow::{Context, Result, anyhow};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a global subscriber printing to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `debug` when `verbose`, else `info`.
pub fn init(verbose: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter(verbose))
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Install a global subscriber writing to `log_file_path`.
pub fn init_to_file(log_file_path: &Path, verbose: bool) -> Result<()> {
    let file = File::create(log_file_path)
        .with_context(|| format!("Failed to create log file {}", log_file_path.display()))?;
    build_file_subscriber(file, verbose)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Subscriber writing plain lines to `file`.
pub fn build_file_subscriber(file: File, verbose: bool) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .with(env_filter(verbose))
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_subscriber_writes_events() {
        let log_file = NamedTempFile::new().unwrap();
        let subscriber = build_file_subscriber(log_file.reopen().unwrap(), false);

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("bucket unreachable");
        });

        let contents = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(contents.contains("bucket unreachable"));
        assert!(contents.contains("WARN"));
    }
}
