//! Sources of fresh database connection handles.

use crate::config::DatabaseConfig;
use crate::errors::{Error, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, SqlxMySqlConnector};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Opens a new connection handle each time the data store (re)connects.
///
/// Handles are expected to hold a single physical connection so the store
/// never owns more than one live connection.
pub trait Connector: Send + Sync + 'static {
    /// Opens a connection. Failures are retried by the caller.
    fn connect(&self) -> impl Future<Output = Result<DatabaseConnection>> + Send;
}

/// Connects to `MySQL` using parameters from [`DatabaseConfig`].
#[derive(Clone, Debug)]
pub struct MySqlConnector {
    config: DatabaseConfig,
    acquire_timeout: Duration,
}

impl MySqlConnector {
    /// Creates a connector for the given server.
    #[must_use]
    pub const fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            acquire_timeout: Duration::from_secs(10),
        }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port);
        if let Some(user) = &self.config.user {
            options = options.username(user);
        }
        if let Some(password) = &self.config.password {
            options = options.password(password);
        }
        if let Some(database) = &self.config.database {
            options = options.database(database);
        }
        options
    }
}

impl Connector for MySqlConnector {
    async fn connect(&self) -> Result<DatabaseConnection> {
        debug!(
            host = %self.config.host,
            port = self.config.port,
            "Opening MySQL connection"
        );
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.acquire_timeout)
            .connect_with(self.connect_options())
            .await
            .map_err(|e| Error::Connection {
                message: e.to_string(),
            })?;
        Ok(SqlxMySqlConnector::from_sqlx_mysql_pool(pool))
    }
}

/// Connects with a `SeaORM` database URL, e.g. `sqlite::memory:`.
#[derive(Clone, Debug)]
pub struct UrlConnector {
    options: ConnectOptions,
}

impl UrlConnector {
    /// Creates a connector for `url`, capped at one pooled connection.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let mut options = ConnectOptions::new(url.into());
        options.max_connections(1).sqlx_logging(false);
        Self { options }
    }
}

impl Connector for UrlConnector {
    async fn connect(&self) -> Result<DatabaseConnection> {
        debug!("Opening database connection");
        Database::connect(self.options.clone())
            .await
            .map_err(|e| Error::Connection {
                message: e.to_string(),
            })
    }
}
