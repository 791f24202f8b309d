use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

use chatview::application::services::NotificationManager;
use chatview::application::use_cases::{ChannelSession, LatestMessageDates, MessageListView};
use chatview::domain::User;
use chatview::infrastructure::{
    CliArgs, ConfigStore, EngineConfig, InMemoryClient, PassthroughTranslator, Transcript,
    init_logging,
};

fn load_config(args: &CliArgs) -> Result<EngineConfig> {
    let store = ConfigStore::new()?;
    let mut config = store.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn print_view(view: &MessageListView) -> Result<()> {
    let mut out = std::io::stdout().lock();
    for entry in &view.entries {
        let style = entry
            .as_message()
            .and_then(|message| view.group_styles.get(message.id()));
        let line = serde_json::json!({ "entry": entry, "group_style": style });
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config).wrap_err("failed to initialize logging")?;

    info!(version = chatview::VERSION, "Starting {}", chatview::NAME);

    let transcript = Transcript::load(&args.transcript)?;
    let user = args
        .user_id
        .clone()
        .map(User::new)
        .or_else(|| transcript.user.clone());

    let channel = transcript.channel();
    let client = Arc::new(InMemoryClient::new(user));
    client.insert_channel(Arc::clone(&channel));
    let notifications = Arc::new(NotificationManager::new(Duration::from_secs(5)));

    let session = ChannelSession::new(
        channel.clone(),
        client,
        notifications.clone(),
        Arc::new(PassthroughTranslator),
        LatestMessageDates::new(),
        &config,
    );
    session.initialize().await?;

    for event in &transcript.events {
        channel.apply_event(event);
        session.dispatcher().handle_event(event).await;
    }
    session.dispatcher().flush();

    print_view(&session.message_list())?;

    for notification in notifications.drain() {
        warn!(level = ?notification.level, text = %notification.text, "Unread notification");
    }
    info!(events = transcript.events.len(), "Replay finished");
    Ok(())
}
