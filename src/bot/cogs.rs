//! Cog registry.
//!
//! A cog is a named group of commands. The bot loads the cogs listed in
//! config.toml; unknown names are logged and skipped so a typo never keeps
//! the bot from starting.

use super::BotData;
use super::commands::{admin, general, testc};
use crate::errors::Error;
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Command type registered with the framework.
pub type Command = poise::Command<BotData, Error>;

/// Names of every cog that can be loaded.
pub const AVAILABLE_COGS: [&str; 3] = ["general", "testc", "admin"];

/// Commands belonging to the cog `name`, or `None` if no such cog exists.
#[must_use]
pub fn cog_commands(name: &str) -> Option<Vec<Command>> {
    match name {
        "general" => Some(vec![general::ping(), general::help()]),
        "testc" => Some(vec![testc::test(), testc::testdb()]),
        "admin" => Some(vec![admin::prefix()]),
        _ => None,
    }
}

/// Resolves cog names into the commands to register, in configuration order.
pub fn load_cogs<S: AsRef<str>>(names: &[S]) -> Vec<Command> {
    let mut loaded = HashSet::new();
    let mut commands = Vec::new();

    for name in names {
        let name = name.as_ref();
        if !loaded.insert(name) {
            warn!("Cog {} listed twice, skipping", name);
            continue;
        }
        match cog_commands(name) {
            Some(cog) => {
                commands.extend(cog);
                info!("Cog loaded: {}", name);
            }
            None => error!(
                "Error loading cog {}: unknown cog (available: {})",
                name,
                AVAILABLE_COGS.join(", ")
            ),
        }
    }
    commands
}
