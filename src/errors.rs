//! Unified error type for the bot and its data store.

use thiserror::Error;

/// Every failure the crate can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Query or schema error reported by the database
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A connection attempt failed
    #[error("Connection error: {message}")]
    Connection {
        /// Driver message
        message: String,
    },

    /// The store was closed; no further operations are accepted
    #[error("Data store is closed")]
    StoreClosed,

    /// A column name that is not part of the table's schema
    #[error("Unknown column `{column}` for table `{table}`")]
    UnknownColumn {
        /// Table being queried
        table: &'static str,
        /// Offending column name
        column: String,
    },

    /// Insert or update without values, or select with an empty column list
    #[error("No columns given for {operation} on table `{table}`")]
    EmptyValues {
        /// Operation name
        operation: &'static str,
        /// Table being written
        table: &'static str,
    },

    /// Update or delete called without a filter
    #[error("Refusing {operation} on table `{table}` without a filter")]
    UnfilteredWrite {
        /// `update` or `delete`
        operation: &'static str,
        /// Table being written
        table: &'static str,
    },

    /// A schema column type the row decoder cannot read
    #[error("Unsupported type for column `{column}`: {column_type}")]
    UnsupportedColumnType {
        /// Column name
        column: String,
        /// Debug rendering of the column type
        column_type: String,
    },

    /// Statement construction failed
    #[error("Query build error: {message}")]
    Query {
        /// Builder message
        message: String,
    },

    /// A command was used with invalid input
    #[error("{message}")]
    Command {
        /// Message shown to the user
        message: String,
    },

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl From<sea_orm::sea_query::error::Error> for Error {
    fn from(value: sea_orm::sea_query::error::Error) -> Self {
        Self::Query {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
