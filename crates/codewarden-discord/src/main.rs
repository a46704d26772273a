use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serenity::Client;
use serenity::all::Http;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use codewarden::config::Config;
use codewarden::dispatch::{self, Dispatcher};
use codewarden::moderation::{CleanupSweep, LiveWins};
use codewarden::outbound::Gateway;
use codewarden_discord::convert::to_channel;
use codewarden_discord::{DiscordPlatform, Handler, intents};

const EVENT_BUFFER: usize = 256;

#[derive(Parser)]
#[command(name = "codewarden")]
#[command(about = "Mirror short codes across Discord channels and keep them tidy", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "codewarden.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.validate()?;

    let token = std::env::var(&config.discord.token_env)
        .with_context(|| format!("{} is not set", config.discord.token_env))?;

    let http = Arc::new(Http::new(&token));
    for &channel in &config.mirror.target_channels {
        http.get_channel(to_channel(channel))
            .await
            .with_context(|| format!("target channel {channel} is not reachable"))?;
    }

    let platform = Arc::new(DiscordPlatform::new(http));
    let gateway = Gateway::new(platform, &config.pacing);
    let dispatcher = Dispatcher::new(&config, gateway.clone())?;
    let live_wins = LiveWins::new(gateway.clone(), &config.live_wins)?;
    let counter = live_wins.clone().spawn();
    let mut cleanup = CleanupSweep::new(gateway, config.cleanup.clone())?;
    if counter.is_some() {
        cleanup = cleanup.with_live_wins(live_wins);
    }
    let daily = cleanup.clone().spawn_daily();

    let (events_tx, events_rx) = dispatch::channel(EVENT_BUFFER);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let dispatcher_task = tokio::spawn(dispatcher.run(events_rx, shutdown_rx));

    let handler = Handler::new(events_tx, cleanup, &config);
    let mut client = Client::builder(&token, intents())
        .event_handler(handler)
        .await
        .context("building Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    info!(
        sources = config.mirror.source_channels.len(),
        targets = config.mirror.target_channels.len(),
        "Starting codewarden"
    );
    if let Err(e) = client.start().await {
        error!(error = %e, "Discord client stopped");
    }

    for task in [daily, counter].into_iter().flatten() {
        task.abort();
    }
    // Live mirrors are deleted before exit.
    let _ = shutdown_tx.send(());
    dispatcher_task.await.context("dispatcher task panicked")?;
    Ok(())
}
