//! Shared test utilities for `cogbot`.
//!
//! This module provides helpers for setting up in-memory `SQLite` data stores
//! and a connector that can simulate connection failures.

use crate::{
    config::StoreSettings,
    errors::{Error, Result},
    store::{Connector, DataStore, UrlConnector},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs a tracing subscriber that writes through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Retries quickly, keep-alive effectively off so tests control every check.
pub const fn fast_settings() -> StoreSettings {
    StoreSettings {
        retry_interval: Duration::from_millis(10),
        keep_alive_interval: Duration::from_secs(3600),
    }
}

/// In-memory `SQLite` connector that fails a set number of times first.
///
/// Clones share state, so a test can keep one clone and hand the other to a
/// store.
#[derive(Clone)]
pub struct FlakyConnector {
    inner: UrlConnector,
    state: Arc<FlakyState>,
}

struct FlakyState {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    overlapping: AtomicUsize,
    current: Mutex<Option<DatabaseConnection>>,
}

impl FlakyConnector {
    /// Fails the first `failures` connection attempts.
    pub fn new(failures: usize) -> Self {
        Self {
            inner: UrlConnector::new("sqlite::memory:"),
            state: Arc::new(FlakyState {
                failures_left: AtomicUsize::new(failures),
                attempts: AtomicUsize::new(0),
                overlapping: AtomicUsize::new(0),
                current: Mutex::new(None),
            }),
        }
    }

    /// Number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    /// Connects made while the previously handed out connection was still open.
    pub fn overlapping_connects(&self) -> usize {
        self.state.overlapping.load(Ordering::SeqCst)
    }

    /// Closes the most recently handed out connection, as if the server went away.
    pub async fn kill_current(&self) -> Result<()> {
        let current = self.state.current.lock().await.take();
        if let Some(conn) = current {
            conn.close().await?;
        }
        Ok(())
    }
}

impl Connector for FlakyConnector {
    async fn connect(&self) -> Result<DatabaseConnection> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.state.current.lock().await.as_ref() {
            if previous.ping().await.is_ok() {
                self.state.overlapping.fetch_add(1, Ordering::SeqCst);
            }
        }
        let should_fail = self
            .state
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Error::Connection {
                message: "simulated connection failure".to_string(),
            });
        }

        let conn = self.inner.connect().await?;
        *self.state.current.lock().await = Some(conn.clone());
        Ok(conn)
    }
}

/// Creates a connected store backed by a fresh in-memory database.
/// Returns the connector too, for tests that break the connection.
pub async fn setup_test_store() -> Result<(DataStore<FlakyConnector>, FlakyConnector)> {
    let connector = FlakyConnector::new(0);
    let store = DataStore::new(connector.clone(), fast_settings())?;
    store.connect().await?;
    Ok((store, connector))
}
