//! Tracing subscriber setup.

use std::path::Path;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use super::config::EngineConfig;

/// Builds the filter from `RUST_LOG`, falling back to the configured level.
#[must_use]
pub fn env_filter(config: &EngineConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()))
}

/// Installs the global subscriber. Logs go to the configured file when one
/// can be resolved, otherwise to stderr.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn init_logging(config: &EngineConfig) -> std::io::Result<()> {
    let filter = env_filter(config);

    if let Some(log_path) = config.effective_log_path() {
        let file = open_log_file(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}
