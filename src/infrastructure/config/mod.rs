//! Engine configuration.

pub mod app_config;
pub mod args;
pub mod storage;

pub use app_config::{
    ChannelListConfig, EngineConfig, EventsConfig, LogLevel, MessageListConfig, PaginationConfig,
};
pub use args::CliArgs;
pub use storage::{ConfigError, ConfigStore};
