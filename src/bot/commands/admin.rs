//! Guild administration commands.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, guilds},
        errors::{Error, Result},
    };

    /// Sets this server's command prefix. Leave empty to reset it.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn prefix(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "New prefix, empty resets to the default"] new_prefix: Option<String>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let new_prefix = guilds::normalize_prefix(new_prefix.as_deref())?;
        guilds::set_guild_prefix(&ctx.data().store, guild_id.get(), new_prefix.as_deref())
            .await?;
        ctx.data().prefixes.set(guild_id.get(), new_prefix.clone()).await;

        let reply = match new_prefix {
            Some(prefix) => format!("Prefix set to `{prefix}`."),
            None => format!(
                "Prefix reset to the default `{}`.",
                ctx.data().config.prefix
            ),
        };
        ctx.say(reply).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
