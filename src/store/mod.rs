//! Resilient data store.
//!
//! `DataStore` owns a single database connection handle behind an async
//! mutex. Connecting retries forever at a fixed interval, every successful
//! connect ensures the schema, and a background keep-alive task pings the
//! handle periodically and reconnects when it is gone or broken. CRUD calls
//! check the handle first and reconnect if needed.
//!
//! Every use of the handle (CRUD, keep-alive, connect, close) holds the lock
//! for its whole duration, so statements from different tasks never
//! interleave on the connection.

pub mod connector;
pub mod query;
pub mod values;

pub use connector::{Connector, MySqlConnector, UrlConnector};
pub use query::{Direction, OrderBy, SelectOptions};
pub use values::{ColumnValues, Params, Row};

use crate::config::{StoreSettings, create_tables};
use crate::entities::TableName;
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement, StatementBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Counters describing the store's connection history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Connection attempts, failed or not
    pub connect_attempts: u64,
    /// Successful connects, each followed by exactly one schema check
    pub connects: u64,
    /// Keep-alive checks run
    pub liveness_checks: u64,
}

#[derive(Debug, Default)]
struct Counters {
    connect_attempts: AtomicU64,
    connects: AtomicU64,
    liveness_checks: AtomicU64,
}

/// Database access with automatic reconnect and keep-alive.
///
/// Cloning is cheap; clones share the same connection. The keep-alive task
/// stops on [`DataStore::close`] or once every clone is dropped.
pub struct DataStore<C = MySqlConnector> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for DataStore<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for DataStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("settings", &self.inner.settings)
            .field("closed", &self.inner.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

struct Inner<C> {
    connector: C,
    settings: StoreSettings,
    connection: Mutex<Option<DatabaseConnection>>,
    shutdown: CancellationToken,
    keep_alive: std::sync::Mutex<Option<JoinHandle<()>>>,
    counters: Counters,
}

impl<C> Drop for Inner<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<C: Connector> DataStore<C> {
    /// Creates a store and starts its keep-alive task.
    ///
    /// No connection is opened here; call [`DataStore::connect`], or let the
    /// first operation or keep-alive tick connect lazily.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// `Error::Config` if either interval in `settings` is zero.
    pub fn new(connector: C, settings: StoreSettings) -> Result<Self> {
        settings.validate()?;
        let inner = Arc::new(Inner {
            connector,
            settings,
            connection: Mutex::new(None),
            shutdown: CancellationToken::new(),
            keep_alive: std::sync::Mutex::new(None),
            counters: Counters::default(),
        });

        let task = spawn_keep_alive(&inner);
        match inner.keep_alive.lock() {
            Ok(mut slot) => *slot = Some(task),
            Err(poisoned) => *poisoned.into_inner() = Some(task),
        }

        debug!(
            "DataStore initialized (retry={:?}, keep_alive={:?})",
            settings.retry_interval, settings.keep_alive_interval
        );
        Ok(Self { inner })
    }

    /// Connects, retrying every `retry_interval` until it succeeds, and
    /// ensures the schema. Replaces (and closes) any existing handle.
    ///
    /// # Errors
    /// Only `Error::StoreClosed`, when the store is closed while waiting.
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.inner.connection.lock().await;
        self.inner.connect_locked(&mut slot).await
    }

    /// Reconnects if there is no handle or the handle fails a ping.
    ///
    /// Advisory: the connection can still drop right after this returns.
    pub async fn reconnect_if_needed(&self) -> Result<()> {
        let mut slot = self.inner.connection.lock().await;
        self.inner.ensure_connected(&mut slot).await
    }

    /// Runs one keep-alive check: `SELECT 1` on the handle, reconnecting when
    /// there is no handle or the query fails.
    pub async fn check_liveness(&self) -> Result<()> {
        self.inner.check_liveness().await
    }

    /// Inserts one row and commits. Returns the number of rows inserted.
    #[instrument(skip(self, data))]
    pub async fn insert(&self, table: TableName, data: &Params) -> Result<u64> {
        let statement = query::insert(table, data)?;
        self.inner.execute(&statement).await
    }

    /// Reads rows from `table`.
    #[instrument(skip(self, options))]
    pub async fn select(&self, table: TableName, options: &SelectOptions) -> Result<Vec<Row>> {
        let (statement, columns) = query::select(table, options)?;
        let mut slot = self.inner.connection.lock().await;
        let conn = self.inner.connected(&mut slot).await?;

        let statement = conn.get_database_backend().build(&statement);
        debug!(sql = %statement, "Running query");
        conn.query_all(statement)
            .await?
            .iter()
            .map(|result| Row::from_query_result(result, &columns))
            .collect()
    }

    /// Updates rows matching `filter` and commits. Returns rows affected.
    ///
    /// # Errors
    /// `Error::UnfilteredWrite` if `filter` is empty.
    #[instrument(skip(self, data, filter))]
    pub async fn update(&self, table: TableName, data: &Params, filter: &Params) -> Result<u64> {
        let statement = query::update(table, data, filter)?;
        self.inner.execute(&statement).await
    }

    /// Updates every row of `table` and commits.
    #[instrument(skip(self, data))]
    pub async fn update_all(&self, table: TableName, data: &Params) -> Result<u64> {
        let statement = query::update_all(table, data)?;
        self.inner.execute(&statement).await
    }

    /// Deletes rows matching `filter` and commits. Returns rows affected.
    ///
    /// # Errors
    /// `Error::UnfilteredWrite` if `filter` is empty.
    #[instrument(skip(self, filter))]
    pub async fn delete(&self, table: TableName, filter: &Params) -> Result<u64> {
        let statement = query::delete(table, filter)?;
        self.inner.execute(&statement).await
    }

    /// Deletes every row of `table` and commits.
    #[instrument(skip(self))]
    pub async fn delete_all(&self, table: TableName) -> Result<u64> {
        self.inner.execute(&query::delete_all(table)).await
    }

    /// Stops the keep-alive task and releases the connection.
    ///
    /// Later operations fail with `Error::StoreClosed`. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        self.inner.shutdown.cancel();

        let task = match self.inner.keep_alive.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Keep-alive task ended abnormally: {}", e);
            }
        }

        let connection = self.inner.connection.lock().await.take();
        if let Some(conn) = connection {
            conn.close().await?;
            info!("Database connection closed.");
        }
        Ok(())
    }

    /// `true` once [`DataStore::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Snapshot of the connection counters.
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        let counters = &self.inner.counters;
        ConnectionStats {
            connect_attempts: counters.connect_attempts.load(Ordering::Relaxed),
            connects: counters.connects.load(Ordering::Relaxed),
            liveness_checks: counters.liveness_checks.load(Ordering::Relaxed),
        }
    }
}

impl<C: Connector> Inner<C> {
    async fn connect_locked(&self, slot: &mut Option<DatabaseConnection>) -> Result<()> {
        if let Some(previous) = slot.take() {
            close_quietly(previous).await;
        }
        loop {
            if self.shutdown.is_cancelled() {
                return Err(Error::StoreClosed);
            }
            self.counters.connect_attempts.fetch_add(1, Ordering::Relaxed);
            info!("Connecting to the database...");

            let attempt = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(Error::StoreClosed),
                attempt = self.open_with_schema() => attempt,
            };
            match attempt {
                Ok(conn) => {
                    *slot = Some(conn);
                    self.counters.connects.fetch_add(1, Ordering::Relaxed);
                    info!("Connected to the database.");
                    return Ok(());
                }
                Err(e) => {
                    error!("Database connection failed: {}", e);
                    warn!("Retrying in {:?}...", self.settings.retry_interval);
                }
            }

            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(Error::StoreClosed),
                () = tokio::time::sleep(self.settings.retry_interval) => {}
            }
        }
    }

    async fn open_with_schema(&self) -> Result<DatabaseConnection> {
        let conn = self.connector.connect().await?;
        if let Err(e) = create_tables(&conn).await {
            close_quietly(conn).await;
            return Err(e);
        }
        Ok(conn)
    }

    async fn ensure_connected(&self, slot: &mut Option<DatabaseConnection>) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(Error::StoreClosed);
        }
        let alive = match slot.as_ref() {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        };
        if !alive {
            warn!("Lost connection to the database. Reconnecting...");
            self.connect_locked(slot).await?;
        }
        Ok(())
    }

    async fn connected<'a>(
        &self,
        slot: &'a mut Option<DatabaseConnection>,
    ) -> Result<&'a DatabaseConnection> {
        self.ensure_connected(slot).await?;
        slot.as_ref().ok_or_else(|| Error::Connection {
            message: "no connection handle after reconnect".to_string(),
        })
    }

    async fn execute<S: StatementBuilder>(&self, statement: &S) -> Result<u64> {
        let mut slot = self.connection.lock().await;
        let conn = self.connected(&mut slot).await?;

        let statement = conn.get_database_backend().build(statement);
        debug!(sql = %statement, "Executing statement");
        let result = conn.execute(statement).await?;
        Ok(result.rows_affected())
    }

    async fn check_liveness(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;
        self.counters.liveness_checks.fetch_add(1, Ordering::Relaxed);

        let outcome = match slot.as_ref() {
            Some(conn) => {
                let backend = conn.get_database_backend();
                conn.execute(Statement::from_string(backend, "SELECT 1"))
                    .await
                    .map(|_| ())
            }
            None => {
                debug!("Keep-alive found no connection");
                return self.connect_locked(&mut slot).await;
            }
        };

        if let Err(e) = outcome {
            error!("Keep-alive error: {}", e);
            return self.connect_locked(&mut slot).await;
        }
        debug!("Keep-alive query succeeded");
        Ok(())
    }
}

async fn close_quietly(conn: DatabaseConnection) {
    if let Err(e) = conn.close().await {
        debug!("Ignoring error while closing stale connection: {}", e);
    }
}

fn spawn_keep_alive<C: Connector>(inner: &Arc<Inner<C>>) -> JoinHandle<()> {
    let store: Weak<Inner<C>> = Arc::downgrade(inner);
    let shutdown = inner.shutdown.clone();
    let period = inner.settings.keep_alive_interval;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    debug!("Keep-alive loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let Some(inner) = store.upgrade() else {
                        break;
                    };
                    if let Err(e) = inner.check_liveness().await {
                        warn!("Keep-alive check failed: {}", e);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{FlakyConnector, fast_settings, init_test_tracing, setup_test_store};
    use std::time::Duration;

    fn test_row(value: i64) -> Params {
        Params::from([("test", value)])
    }

    async fn wait_for<F>(mut condition: F)
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_insert_select_delete_scenario() -> Result<()> {
        init_test_tracing();
        let (store, _) = setup_test_store().await?;

        store.insert(TableName::Test, &test_row(42)).await?;
        let rows = store
            .select(TableName::Test, &SelectOptions::new().filter(test_row(42)))
            .await?;
        assert_eq!(rows, vec![test_row(42)]);

        let deleted = store.delete(TableName::Test, &test_row(42)).await?;
        assert_eq!(deleted, 1);
        let rows = store
            .select(TableName::Test, &SelectOptions::new().filter(test_row(42)))
            .await?;
        assert!(rows.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_select_without_filter_returns_every_row() -> Result<()> {
        init_test_tracing();
        let (store, _) = setup_test_store().await?;

        for value in [3, 1, 2] {
            store.insert(TableName::Test, &test_row(value)).await?;
        }
        let rows = store.select(TableName::Test, &SelectOptions::new()).await?;
        assert_eq!(rows.len(), 3);

        let ordered = store
            .select(
                TableName::Test,
                &SelectOptions::new().order_by(OrderBy::desc("test")).limit(2),
            )
            .await?;
        let values: Vec<i64> = ordered.iter().filter_map(|row| row.get_i64("test")).collect();
        assert_eq!(values, vec![3, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_leaves_other_rows_untouched() -> Result<()> {
        init_test_tracing();
        let (store, _) = setup_test_store().await?;

        store
            .insert(TableName::Guilds, &Params::from([("guild_id", 1i64)]))
            .await?;
        store
            .insert(TableName::Guilds, &Params::from([("guild_id", 2i64)]))
            .await?;

        let changed = store
            .update(
                TableName::Guilds,
                &Params::from([("prefix", "!")]),
                &Params::from([("guild_id", 1i64)]),
            )
            .await?;
        assert_eq!(changed, 1);

        let rows = store
            .select(
                TableName::Guilds,
                &SelectOptions::new().order_by(OrderBy::asc("guild_id")),
            )
            .await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_str("prefix"), Some("!"));
        assert_eq!(rows[1].get_i64("guild_id"), Some(2));
        assert_eq!(rows[1].get_str("prefix"), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_only_matching_rows() -> Result<()> {
        init_test_tracing();
        let (store, _) = setup_test_store().await?;

        store.insert(TableName::Test, &test_row(1)).await?;
        store.insert(TableName::Test, &test_row(2)).await?;
        store.delete(TableName::Test, &test_row(1)).await?;

        let rows = store.select(TableName::Test, &SelectOptions::new()).await?;
        assert_eq!(rows, vec![test_row(2)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unfiltered_writes_need_explicit_calls() -> Result<()> {
        init_test_tracing();
        let (store, _) = setup_test_store().await?;
        store.insert(TableName::Test, &test_row(1)).await?;
        store.insert(TableName::Test, &test_row(2)).await?;

        let result = store.delete(TableName::Test, &Params::new()).await;
        assert!(matches!(result, Err(Error::UnfilteredWrite { .. })));
        assert_eq!(
            store.select(TableName::Test, &SelectOptions::new()).await?.len(),
            2
        );

        assert_eq!(store.delete_all(TableName::Test).await?, 2);
        assert!(
            store
                .select(TableName::Test, &SelectOptions::new())
                .await?
                .is_empty()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_constraint_violation_propagates() -> Result<()> {
        init_test_tracing();
        let (store, _) = setup_test_store().await?;

        store.insert(TableName::Test, &test_row(7)).await?;
        let result = store.insert(TableName::Test, &test_row(7)).await;
        assert!(matches!(result, Err(Error::Database(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_columns_fail_before_connecting() -> Result<()> {
        init_test_tracing();
        let connector = FlakyConnector::new(0);
        let store = DataStore::new(connector.clone(), fast_settings())?;

        let result = store
            .insert(TableName::Test, &Params::from([("nope", 1i64)]))
            .await;
        assert!(matches!(result, Err(Error::UnknownColumn { .. })));
        assert_eq!(connector.attempts(), 0);
        store.close().await
    }

    #[tokio::test]
    async fn test_connect_retries_until_success() -> Result<()> {
        init_test_tracing();
        let connector = FlakyConnector::new(1);
        let store = DataStore::new(connector.clone(), fast_settings())?;

        store.connect().await?;

        let stats = store.stats();
        assert_eq!(connector.attempts(), 2);
        assert_eq!(stats.connect_attempts, 2);
        assert_eq!(stats.connects, 1);
        assert!(
            store
                .select(TableName::Test, &SelectOptions::new())
                .await?
                .is_empty()
        );
        assert_eq!(store.stats().connects, 1);
        store.close().await
    }

    #[tokio::test]
    async fn test_operations_connect_lazily() -> Result<()> {
        init_test_tracing();
        let connector = FlakyConnector::new(0);
        let store = DataStore::new(connector.clone(), fast_settings())?;

        store.insert(TableName::Test, &test_row(5)).await?;
        assert_eq!(store.stats().connects, 1);
        assert_eq!(
            store.select(TableName::Test, &SelectOptions::new()).await?,
            vec![test_row(5)]
        );
        store.close().await
    }

    #[tokio::test]
    async fn test_dead_handle_is_replaced() -> Result<()> {
        init_test_tracing();
        let (store, connector) = setup_test_store().await?;

        connector.kill_current().await?;
        store.check_liveness().await?;
        assert_eq!(store.stats().connects, 2);

        connector.kill_current().await?;
        store.insert(TableName::Test, &test_row(9)).await?;
        assert_eq!(store.stats().connects, 3);
        assert_eq!(
            store.select(TableName::Test, &SelectOptions::new()).await?,
            vec![test_row(9)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reconnect_closes_previous_handle_first() -> Result<()> {
        init_test_tracing();
        let (store, connector) = setup_test_store().await?;

        store.connect().await?;
        store.connect().await?;
        assert_eq!(store.stats().connects, 3);
        assert_eq!(connector.overlapping_connects(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_intervals_are_rejected() {
        init_test_tracing();
        let settings = StoreSettings {
            keep_alive_interval: Duration::ZERO,
            ..fast_settings()
        };
        let result = DataStore::new(FlakyConnector::new(0), settings);
        assert!(matches!(result, Err(Error::Config { .. })));

        let settings = StoreSettings {
            retry_interval: Duration::ZERO,
            ..fast_settings()
        };
        let result = DataStore::new(FlakyConnector::new(0), settings);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_keep_alive_task_connects_in_background() -> Result<()> {
        init_test_tracing();
        let settings = StoreSettings {
            retry_interval: Duration::from_millis(10),
            keep_alive_interval: Duration::from_millis(20),
        };
        let store = DataStore::new(FlakyConnector::new(0), settings)?;

        wait_for(|| store.stats().connects >= 1).await;
        wait_for(|| store.stats().liveness_checks >= 2).await;
        assert_eq!(store.stats().connects, 1);
        store.close().await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_liveness_checks_do_not_interleave_with_crud() -> Result<()> {
        init_test_tracing();
        let (store, _) = setup_test_store().await?;

        let mut tasks = Vec::new();
        for value in 0..20i64 {
            let writer = store.clone();
            tasks.push(tokio::spawn(async move {
                writer.insert(TableName::Test, &test_row(value)).await?;
                writer.check_liveness().await
            }));
            let reader = store.clone();
            tasks.push(tokio::spawn(async move {
                reader.select(TableName::Test, &SelectOptions::new()).await?;
                reader.check_liveness().await
            }));
        }
        for task in tasks {
            task.await.unwrap()?;
        }

        let rows = store
            .select(TableName::Test, &SelectOptions::new().order_by(OrderBy::asc("test")))
            .await?;
        let values: Vec<i64> = rows.iter().filter_map(|row| row.get_i64("test")).collect();
        assert_eq!(values, (0..20).collect::<Vec<_>>());

        let stats = store.stats();
        assert_eq!(stats.liveness_checks, 40);
        assert_eq!(stats.connects, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_close_stops_everything() -> Result<()> {
        init_test_tracing();
        let (store, _) = setup_test_store().await?;

        store.close().await?;
        assert!(store.is_closed());
        store.close().await?;

        let result = store.insert(TableName::Test, &test_row(1)).await;
        assert!(matches!(result, Err(Error::StoreClosed)));
        assert!(matches!(store.connect().await, Err(Error::StoreClosed)));
        Ok(())
    }

    #[tokio::test]
    async fn test_close_interrupts_retry_loop() -> Result<()> {
        init_test_tracing();
        let settings = StoreSettings {
            retry_interval: Duration::from_secs(3600),
            keep_alive_interval: Duration::from_secs(3600),
        };
        let connector = FlakyConnector::new(usize::MAX);
        let store = DataStore::new(connector.clone(), settings)?;

        let connecting = {
            let store = store.clone();
            tokio::spawn(async move { store.connect().await })
        };
        wait_for(|| connector.attempts() >= 1).await;

        store.close().await?;
        let outcome = tokio::time::timeout(Duration::from_secs(5), connecting)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, Err(Error::StoreClosed)));
        Ok(())
    }
}
