mod bot;
mod cli;
mod commands;
mod config;
mod dispatch;
mod error;
mod peripheral;
mod platform;
mod update;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::PollingLoop;
use crate::cli::{Cli, Mode};
use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::peripheral::PeripheralController;
use crate::platform::telegram::TelegramApi;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pibot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    info!("Loading configuration from: {}", cli.config.display());
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    info!("Configuration loaded successfully");
    info!("  Name: {}", config.name());
    info!("  Polling period: {:?}", config.polling_period());
    info!("  Echo mode: {}", config.bot.debug);

    let api = TelegramApi::new(&config.bot.api_base_url, config.token())?;

    let peripheral =
        PeripheralController::from_config(&config.peripheral, config.blink_period());
    if !peripheral.has_led() {
        info!("  LED commands will only reply");
    }

    let registry = CommandRegistry::with_builtins();
    info!("  Commands: {}", registry.len());
    let dispatcher = Dispatcher::new(registry, peripheral, config.version_banner());

    let mut bot = PollingLoop::new(api, dispatcher, config.bot.debug, config.polling_period());

    match cli.mode() {
        Mode::Once => {
            info!("Processing pending updates...");
            bot.run_once().await?;
            debug!("Polling loop finished in state {:?}", bot.state());
        }
        Mode::Run => {
            info!("Bot is starting...");
            tokio::select! {
                result = bot.run_forever() => result?,
                _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
            }
        }
    }

    Ok(())
}
