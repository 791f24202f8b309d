//! Infrastructure layer with configuration and adapters.

/// Engine configuration.
pub mod config;
/// Key-passthrough translator.
pub mod i18n;
/// Tracing subscriber setup.
pub mod logging;
/// In-memory chat client adapters.
pub mod memory;
/// Recorded transcripts for replay.
pub mod transcript;

pub use config::{CliArgs, ConfigError, ConfigStore, EngineConfig, LogLevel};
pub use i18n::PassthroughTranslator;
pub use logging::init_logging;
pub use memory::{InMemoryChannel, InMemoryClient};
pub use transcript::Transcript;
