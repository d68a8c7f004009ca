//! Database access layer
//!
//! [`Database`] is the connector handed to every request handler. It connects
//! lazily and idempotently and never fails the caller: a connection error is
//! logged and the connector stays disconnected, so the failure surfaces at
//! the next query as [`Error::NotConnected`](crate::Error::NotConnected).
//! Readiness is reported by [`Database::health`].

pub mod correlated;
pub mod raw_events;
pub mod schema;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{Error, Result};

/// Default pool size
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connector state as reported by health checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

enum Slot {
    Disconnected,
    Connecting,
    Connected(SqlitePool),
}

struct Inner {
    url: Option<String>,
    max_connections: u32,
    slot: Mutex<Slot>,
}

/// Shared database connector
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

/// Result of a readiness probe
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHealth {
    pub state: ConnectionState,
    /// Set when the pool is up but a trivial query failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseHealth {
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Connected && self.error.is_none()
    }
}

impl Database {
    /// Create a disconnected connector for `url`
    ///
    /// `None` (or an empty string) is accepted; [`connect`](Self::connect)
    /// then logs the problem and leaves the connector disconnected.
    pub fn new(url: Option<String>, max_connections: u32) -> Self {
        let url = url.filter(|u| !u.trim().is_empty());
        Self {
            inner: Arc::new(Inner {
                url,
                max_connections: max_connections.max(1),
                slot: Mutex::new(Slot::Disconnected),
            }),
        }
    }

    /// Wrap an already open pool
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self {
            inner: Arc::new(Inner {
                url: None,
                max_connections: DEFAULT_MAX_CONNECTIONS,
                slot: Mutex::new(Slot::Connected(pool)),
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.inner
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Connect if not already connected
    ///
    /// - connected: no-op
    /// - another attempt in flight: logs and returns without waiting
    /// - otherwise: opens the pool; failures are logged, not returned
    pub async fn connect(&self) {
        {
            let mut slot = self.slot();
            match &*slot {
                Slot::Connected(_) => {
                    debug!("Database connection already established");
                    return;
                }
                Slot::Connecting => {
                    info!("Database connection is in progress");
                    return;
                }
                Slot::Disconnected => {}
            }
            *slot = Slot::Connecting;
        }
        let mut attempt = ConnectAttempt {
            db: self,
            settled: false,
        };

        let Some(url) = self.inner.url.as_deref() else {
            warn!("No database URL configured; database stays disconnected");
            return;
        };

        match open_pool(url, self.inner.max_connections).await {
            Ok(pool) => {
                info!("Connected to database");
                *self.slot() = Slot::Connected(pool);
                attempt.settled = true;
            }
            Err(e) => {
                error!(error = %e, "Error connecting to database");
            }
        }
    }

    /// Pool handle, or [`Error::NotConnected`] when not connected
    pub fn pool(&self) -> Result<SqlitePool> {
        match &*self.slot() {
            Slot::Connected(pool) => Ok(pool.clone()),
            _ => Err(Error::NotConnected),
        }
    }

    pub fn state(&self) -> ConnectionState {
        match &*self.slot() {
            Slot::Disconnected => ConnectionState::Disconnected,
            Slot::Connecting => ConnectionState::Connecting,
            Slot::Connected(_) => ConnectionState::Connected,
        }
    }

    /// Readiness probe; never triggers a connection attempt
    pub async fn health(&self) -> DatabaseHealth {
        let pool = match self.pool() {
            Ok(pool) => pool,
            Err(_) => {
                return DatabaseHealth {
                    state: self.state(),
                    error: None,
                }
            }
        };

        let error = sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .err()
            .map(|e| e.to_string());

        DatabaseHealth {
            state: ConnectionState::Connected,
            error,
        }
    }

    /// Close the pool and return to the disconnected state
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.slot(), Slot::Disconnected);
        if let Slot::Connected(pool) = previous {
            pool.close().await;
            info!("Database connection closed");
        }
    }
}

/// Resets a `Connecting` slot to `Disconnected` unless the attempt produced a
/// pool, including when the `connect` future is dropped mid-await.
struct ConnectAttempt<'a> {
    db: &'a Database,
    settled: bool,
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut slot = self.db.slot();
        if matches!(*slot, Slot::Connecting) {
            *slot = Slot::Disconnected;
        }
    }
}

/// Open a pool for `url` and create missing tables
pub async fn open_pool(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;

    schema::init_tables(&pool).await?;
    Ok(pool)
}
