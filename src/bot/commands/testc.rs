//! Test cog - a canned reply plus commands that read and write the `test` table.
//!
//! `testdb` is mostly useful for checking that the data store works end to end
//! from Discord.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        entities::TableName,
        errors::{Error, Result},
        store::{OrderBy, Params, SelectOptions},
    };

    /// Replies with a fixed test message.
    #[poise::command(slash_command, prefix_command)]
    pub async fn test(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("e").await?;
        Ok(())
    }

    /// Reads and writes values in the test table.
    #[poise::command(
        slash_command,
        prefix_command,
        subcommands("testdb_add", "testdb_list", "testdb_remove"),
        subcommand_required
    )]
    pub async fn testdb(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Stores a number in the test table.
    #[poise::command(slash_command, prefix_command, rename = "add")]
    pub async fn testdb_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Number to store"] value: i64,
    ) -> Result<()> {
        ctx.data()
            .store
            .insert(TableName::Test, &Params::from([("test", value)]))
            .await?;
        ctx.say(format!("Stored `{value}`.")).await?;
        Ok(())
    }

    /// Lists the numbers in the test table.
    #[poise::command(slash_command, prefix_command, rename = "list")]
    pub async fn testdb_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let options = SelectOptions::new()
            .order_by(OrderBy::asc("test"))
            .limit(super::LIST_LIMIT);
        let rows = ctx.data().store.select(TableName::Test, &options).await?;
        let values: Vec<i64> = rows.iter().filter_map(|row| row.get_i64("test")).collect();
        ctx.say(super::format_values(&values)).await?;
        Ok(())
    }

    /// Removes a number from the test table.
    #[poise::command(slash_command, prefix_command, rename = "remove")]
    pub async fn testdb_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Number to remove"] value: i64,
    ) -> Result<()> {
        let removed = ctx
            .data()
            .store
            .delete(TableName::Test, &Params::from([("test", value)]))
            .await?;
        let reply = if removed == 0 {
            format!("`{value}` was not stored.")
        } else {
            format!("Removed `{value}`.")
        };
        ctx.say(reply).await?;
        Ok(())
    }
}

const LIST_LIMIT: u64 = 25;

fn format_values(values: &[i64]) -> String {
    if values.is_empty() {
        return "No values stored.".to_string();
    }
    let listed: Vec<String> = values.iter().map(|v| format!("`{v}`")).collect();
    format!("Stored values: {}", listed.join(", "))
}

// Re-export all commands
pub use inner::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_values() {
        assert_eq!(format_values(&[]), "No values stored.");
        assert_eq!(format_values(&[1, 42]), "Stored values: `1`, `42`");
    }
}
