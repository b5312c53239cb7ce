//! General Discord commands - ping and help.
//! These commands don't touch the database and only report on the bot itself.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };
    use tracing::info;

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        info!("Ping command received from user: {}", ctx.author().name);
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let prefix = &ctx.data().config.prefix;
        ctx.say(super::help_text(prefix)).await?;
        Ok(())
    }
}

fn help_text(prefix: &str) -> String {
    format!(
        "**Help**\n\
        Commands work as slash commands or with the `{prefix}` prefix.\n\n\
        **General**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.\n\n\
        **Test**\n\
        • `/test` - Replies with a test message.\n\
        • `/testdb add <value>` - Stores a number.\n\
        • `/testdb list` - Lists stored numbers.\n\
        • `/testdb remove <value>` - Removes a stored number.\n\n\
        **Admin**\n\
        • `/prefix [prefix]` - Sets this server's prefix, empty resets it."
    )
}

// Re-export all commands
pub use inner::*;
