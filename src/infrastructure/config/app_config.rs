//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::application::services::ProcessMessagesOptions;

pub(crate) const APP_NAME: &str = "chatview";
pub(crate) const APP_QUALIFIER: &str = "io";
pub(crate) const APP_ORGANIZATION: &str = "chatview";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Message and channel paging.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Event handling rates.
    #[serde(default)]
    pub events: EventsConfig,

    /// Message list preparation.
    #[serde(default)]
    pub message_list: MessageListConfig,

    /// Channel list behaviour.
    #[serde(default)]
    pub channel_list: ChannelListConfig,
}

/// Paging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Messages requested per page.
    #[serde(default = "default_message_page_size")]
    pub message_page_size: usize,

    /// Channels requested per page.
    #[serde(default = "default_channel_page_size")]
    pub channel_page_size: usize,

    /// A jump to the latest page reporting at least this many messages
    /// assumes older ones exist.
    #[serde(default = "default_jump_to_latest_threshold")]
    pub jump_to_latest_threshold: usize,

    /// How long a jumped-to message stays highlighted, in milliseconds.
    #[serde(default = "default_highlight_duration_ms")]
    pub highlight_duration_ms: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            message_page_size: default_message_page_size(),
            channel_page_size: default_channel_page_size(),
            jump_to_latest_threshold: default_jump_to_latest_threshold(),
            highlight_duration_ms: default_highlight_duration_ms(),
        }
    }
}

impl PaginationConfig {
    /// Highlight duration after a jump.
    #[must_use]
    pub const fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }
}

/// Event throttling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Minimum spacing of full state copies after events, in milliseconds.
    #[serde(default = "default_copy_state_throttle_ms")]
    pub copy_state_throttle_ms: u64,

    /// Minimum spacing of reaction toggles, in milliseconds.
    #[serde(default = "default_reaction_throttle_ms")]
    pub reaction_throttle_ms: u64,

    /// Minimum spacing of mark-read calls, in milliseconds.
    #[serde(default = "default_mark_read_throttle_ms")]
    pub mark_read_throttle_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            copy_state_throttle_ms: default_copy_state_throttle_ms(),
            reaction_throttle_ms: default_reaction_throttle_ms(),
            mark_read_throttle_ms: default_mark_read_throttle_ms(),
        }
    }
}

impl EventsConfig {
    /// Spacing of full state copies after events.
    #[must_use]
    pub const fn copy_state_throttle(&self) -> Duration {
        Duration::from_millis(self.copy_state_throttle_ms)
    }

    /// Spacing of reaction requests.
    #[must_use]
    pub const fn reaction_throttle(&self) -> Duration {
        Duration::from_millis(self.reaction_throttle_ms)
    }

    /// Spacing of mark-read requests.
    #[must_use]
    pub const fn mark_read_throttle(&self) -> Duration {
        Duration::from_millis(self.mark_read_throttle_ms)
    }
}

/// Message list configuration.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageListConfig {
    /// Insert date separators between days.
    #[serde(default = "default_true")]
    pub enable_date_separator: bool,

    /// Drop deleted messages instead of showing a placeholder.
    #[serde(default)]
    pub hide_deleted_messages: bool,

    /// Do not mark the first unread message.
    #[serde(default)]
    pub hide_new_message_separator: bool,

    /// Render every message on its own.
    #[serde(default)]
    pub no_group_by_user: bool,

    /// Split groups when consecutive messages are further apart, in
    /// milliseconds.
    #[serde(default)]
    pub max_time_between_grouped_messages_ms: Option<i64>,
}

impl Default for MessageListConfig {
    fn default() -> Self {
        Self {
            enable_date_separator: true,
            hide_deleted_messages: false,
            hide_new_message_separator: false,
            no_group_by_user: false,
            max_time_between_grouped_messages_ms: None,
        }
    }
}

impl MessageListConfig {
    /// Pipeline options for this configuration.
    #[must_use]
    pub fn process_options(&self) -> ProcessMessagesOptions {
        ProcessMessagesOptions {
            enable_date_separator: self.enable_date_separator,
            hide_deleted_messages: self.hide_deleted_messages,
            hide_new_message_separator: self.hide_new_message_separator,
            ..ProcessMessagesOptions::default()
        }
    }
}

/// Channel list configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelListConfig {
    /// Keep the order stable on new messages.
    #[serde(default)]
    pub lock_channel_order: bool,

    /// Add channels outside the current filter when they get a message.
    #[serde(default = "default_true")]
    pub allow_new_messages_from_unfiltered_channels: bool,
}

impl Default for ChannelListConfig {
    fn default() -> Self {
        Self {
            lock_channel_order: false,
            allow_new_messages_from_unfiltered_channels: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_message_page_size() -> usize {
    100
}

const fn default_channel_page_size() -> usize {
    30
}

const fn default_jump_to_latest_threshold() -> usize {
    25
}

const fn default_highlight_duration_ms() -> u64 {
    500
}

const fn default_copy_state_throttle_ms() -> u64 {
    500
}

const fn default_reaction_throttle_ms() -> u64 {
    1000
}

const fn default_mark_read_throttle_ms() -> u64 {
    500
}

impl EngineConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(page_size) = args.page_size {
            self.pagination.message_page_size = page_size;
        }
        if args.hide_deleted {
            self.message_list.hide_deleted_messages = true;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("chatview.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            log_level = "debug"

            [pagination]
            message_page_size = 50

            [message_list]
            hide_deleted_messages = true
            max_time_between_grouped_messages_ms = 60000

            [channel_list]
            lock_channel_order = true
        "#;

        let config: EngineConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.pagination.message_page_size, 50);
        assert_eq!(config.pagination.jump_to_latest_threshold, 25);
        assert!(config.message_list.hide_deleted_messages);
        assert!(config.message_list.enable_date_separator);
        assert_eq!(
            config.message_list.max_time_between_grouped_messages_ms,
            Some(60_000)
        );
        assert!(config.channel_list.lock_channel_order);
        assert!(config.channel_list.allow_new_messages_from_unfiltered_channels);
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.pagination.message_page_size, 100);
        assert_eq!(config.pagination.channel_page_size, 30);
        assert_eq!(config.pagination.highlight_duration(), Duration::from_millis(500));
        assert_eq!(config.events.copy_state_throttle(), Duration::from_millis(500));
        assert_eq!(config.events.reaction_throttle(), Duration::from_secs(1));
        assert_eq!(config.events.mark_read_throttle(), Duration::from_millis(500));
        assert!(config.message_list.enable_date_separator);
    }

    #[test]
    fn test_empty_file_matches_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
