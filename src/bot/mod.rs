//! Bot layer - Discord-specific interface and command handlers
//!
//! This module wires the data store into the `poise` framework: it loads the
//! configured cogs, registers guilds when the bot becomes ready, resolves
//! per-guild prefixes, and runs the gateway client until shutdown.

/// Cog registry mapping cog names to their commands
pub mod cogs;
/// Discord command implementations grouped by cog
pub mod commands;
/// Guild registration and per-guild settings
pub mod guilds;

use crate::config::BotConfig;
use crate::errors::{Error, Result};
use crate::store::DataStore;
use guilds::PrefixCache;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
/// Holds the data store, the bot settings and the guild prefix cache;
/// commands never see the connection handle itself.
pub struct BotData {
    /// Data store for all database operations
    pub store: DataStore,
    /// Settings loaded at startup
    pub config: Arc<BotConfig>,
    /// Per-guild prefixes, kept in sync by the prefix command
    pub prefixes: PrefixCache,
}

impl BotData {
    /// Creates a new `BotData` instance with the given store, settings and cache.
    #[must_use]
    pub const fn new(store: DataStore, config: Arc<BotConfig>, prefixes: PrefixCache) -> Self {
        Self {
            store,
            config,
            prefixes,
        }
    }
}

/// Context type used by every command.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

async fn resolve_prefix(
    ctx: poise::PartialContext<'_, BotData, Error>,
) -> Result<Option<String>> {
    let guild_id = ctx.guild_id.map(serenity::GuildId::get);
    let prefix = ctx.data.prefixes.resolve(guild_id, &ctx.data.config.prefix).await;
    Ok(Some(prefix))
}

/// Runs the bot until the gateway connection ends or Ctrl-C is pressed.
///
/// The store is not closed here; the caller owns its lifetime.
#[instrument(skip(token, config, store))]
pub async fn run_bot(token: String, config: Arc<BotConfig>, store: DataStore) -> Result<()> {
    let commands = cogs::load_cogs(&config.cogs);
    info!("{} commands loaded from {} cogs", commands.len(), config.cogs.len());

    let setup_config = Arc::clone(&config);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: None,
                dynamic_prefix: Some(|ctx| Box::pin(resolve_prefix(ctx))),
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Setting up the bot...");
                let guild_ids: Vec<u64> = ready.guilds.iter().map(|g| g.id.get()).collect();
                let added = guilds::register_new_guilds(&store, guild_ids).await?;
                if added > 0 {
                    info!("Registered {} new guilds", added);
                }
                let prefixes = PrefixCache::default();
                prefixes.refresh(&store).await?;

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                info!("-----------------------------------------");
                info!("{} is ready", ready.user.name);
                info!("ID: {}", ready.user.id);
                info!("Prefix: {}", setup_config.prefix);
                info!("In {} servers", ready.guilds.len());
                info!("-----------------------------------------");

                Ok(BotData::new(store, setup_config, prefixes))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::all();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, stopping shards...");
            shard_manager.shutdown_all().await;
        }
    });

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}
