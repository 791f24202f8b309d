//! Command-line arguments.

use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments of the replay binary.
#[derive(Debug, Parser)]
#[command(
    name = "chatview",
    version,
    about = "Replays a chat event transcript through the channel render engine",
    long_about = None
)]
pub struct CliArgs {
    /// Transcript file (JSON: initial snapshot plus events).
    #[arg(value_name = "TRANSCRIPT")]
    pub transcript: PathBuf,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Viewing user ID.
    #[arg(long, value_name = "ID")]
    pub user_id: Option<String>,

    /// Messages requested per page.
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Drop deleted messages from the output.
    #[arg(long)]
    pub hide_deleted: bool,
}
