//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables known to the bot.
//! `TableName` is the closed set of tables the data store accepts; adding a
//! table means adding its entity here and a variant below.

pub mod guild;
pub mod test_record;

use crate::errors::{Error, Result};
use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable, Schema};
use std::fmt;

// Re-export specific types to avoid conflicts
pub use guild::{Column as GuildColumn, Entity as Guild, Model as GuildModel};
pub use test_record::{Column as TestColumn, Entity as TestRecord, Model as TestModel};

/// Tables the data store can read and write.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TableName {
    /// `test` table, one BIGINT primary key column
    Test,
    /// `guilds` table, one row per joined guild
    Guilds,
}

/// Name and type of a single table column, taken from the entity definition.
#[derive(Clone, Debug)]
pub struct ColumnSpec {
    /// Column identifier as it appears in SQL
    pub name: String,
    /// Declared column type, used to decode result rows
    pub column_type: ColumnType,
}

impl TableName {
    /// Every known table, in creation order.
    pub const ALL: [Self; 2] = [Self::Test, Self::Guilds];

    /// SQL identifier of the table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Guilds => "guilds",
        }
    }

    /// All columns of the table in declaration order.
    #[must_use]
    pub fn columns(self) -> Vec<ColumnSpec> {
        match self {
            Self::Test => column_specs::<TestRecord>(),
            Self::Guilds => column_specs::<Guild>(),
        }
    }

    /// Looks up a column by name, failing for identifiers outside the schema.
    pub fn column(self, name: &str) -> Result<ColumnSpec> {
        self.columns()
            .into_iter()
            .find(|column| column.name == name)
            .ok_or_else(|| Error::UnknownColumn {
                table: self.as_str(),
                column: name.to_string(),
            })
    }

    /// `CREATE TABLE IF NOT EXISTS` statement generated from the entity.
    #[must_use]
    pub fn create_statement(self, schema: &Schema) -> TableCreateStatement {
        let mut statement = match self {
            Self::Test => schema.create_table_from_entity(TestRecord),
            Self::Guilds => schema.create_table_from_entity(Guild),
        };
        statement.if_not_exists();
        statement
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn column_specs<E: EntityTrait>() -> Vec<ColumnSpec> {
    E::Column::iter()
        .map(|column| ColumnSpec {
            name: column.as_str().to_owned(),
            column_type: column.def().get_column_type().clone(),
        })
        .collect()
}
