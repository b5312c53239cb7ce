//! Database configuration module.
//!
//! Reads MySQL connection parameters and data store timing from the
//! environment and creates the tables described by the entity definitions.
//! Table SQL is generated with `SeaORM`'s `Schema::create_table_from_entity`,
//! so the database schema always matches the Rust structs.

use crate::entities::TableName;
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, DatabaseBackend, Schema, Statement};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default wait between failed connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);
/// Default period of the keep-alive liveness check.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3306;

/// MySQL connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Server host name, `DB_HOST`
    pub host: String,
    /// Server port, `DB_PORT`
    pub port: u16,
    /// Login user, `DB_USER`
    pub user: Option<String>,
    /// Login password, `DB_PASSWORD`
    pub password: Option<String>,
    /// Schema to use, `DB_DATABASE`
    pub database: Option<String>,
}

// Keeps the password out of logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}

impl DatabaseConfig {
    /// Reads the connection parameters from the process environment.
    ///
    /// `DB_HOST` defaults to `localhost` and `DB_PORT` to 3306.
    ///
    /// # Errors
    /// Returns `Error::Config` if `DB_PORT` is not a valid port number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("DB_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| Error::Config {
                message: format!("Invalid DB_PORT '{raw}': {e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: lookup("DB_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            user: lookup("DB_USER"),
            password: lookup("DB_PASSWORD"),
            database: lookup("DB_DATABASE"),
        })
    }
}

/// Timing of the data store's reconnect and keep-alive behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreSettings {
    /// Wait between failed connection attempts
    pub retry_interval: Duration,
    /// Period of the liveness check
    pub keep_alive_interval: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
        }
    }
}

impl StoreSettings {
    /// Reads `DB_RETRY_INTERVAL` and `DB_KEEP_ALIVE_INTERVAL` (whole seconds).
    ///
    /// # Errors
    /// Returns `Error::Config` for values that are not positive integers.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            retry_interval: seconds(&lookup, "DB_RETRY_INTERVAL")?
                .unwrap_or(defaults.retry_interval),
            keep_alive_interval: seconds(&lookup, "DB_KEEP_ALIVE_INTERVAL")?
                .unwrap_or(defaults.keep_alive_interval),
        })
    }

    /// Checks that both intervals are non-zero.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the zero interval.
    pub fn validate(&self) -> Result<()> {
        if self.retry_interval.is_zero() {
            return Err(Error::Config {
                message: "retry interval must be greater than zero".to_string(),
            });
        }
        if self.keep_alive_interval.is_zero() {
            return Err(Error::Config {
                message: "keep-alive interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn seconds<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::Config {
            message: format!("{key} must be a positive number of seconds, got '{raw}'"),
        }),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
    }
}

/// Builds the `CREATE TABLE IF NOT EXISTS` statements for every known table.
///
/// `MySQL` tables get the `InnoDB` engine and the `utf8mb4` character set.
#[must_use]
pub fn table_statements(backend: DatabaseBackend) -> Vec<Statement> {
    let schema = Schema::new(backend);
    TableName::ALL
        .iter()
        .map(|table| {
            let mut statement = table.create_statement(&schema);
            if backend == DatabaseBackend::MySql {
                statement
                    .engine("InnoDB")
                    .character_set("utf8mb4")
                    .collate("utf8mb4_unicode_ci");
            }
            backend.build(&statement)
        })
        .collect()
}

/// Creates all tables that do not exist yet. Safe to call on every connect.
#[instrument(skip(db))]
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    for statement in table_statements(db.get_database_backend()) {
        debug!(sql = %statement, "Ensuring table");
        db.execute(statement).await?;
    }
    info!("Database tables ensured.");
    Ok(())
}
