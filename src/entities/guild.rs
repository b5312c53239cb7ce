//! Guild entity - One row per guild the bot has joined.
//!
//! Rows are created when the bot becomes ready and sees a guild it has not
//! recorded yet. `prefix` overrides the configured command prefix.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guild database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guilds")]
pub struct Model {
    /// Discord guild ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    /// Prefix override for text commands, `None` uses the default
    pub prefix: Option<String>,
}

/// Guilds have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
