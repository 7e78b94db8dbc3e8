//! Entity store gateway
//!
//! Owns the bounded SQLite connection pool and hands out transactions.
//! Every repository receives a [`StoreGateway`] explicitly; there is no
//! process-wide pool.

mod schema;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::Result;

/// A unit of work. Dropping it without calling `commit` rolls it back.
pub type Tx = Transaction<'static, Sqlite>;

/// Connection settings for the store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite URL, e.g. `sqlite://data/notesphere.db`
    pub url: String,
    /// Upper bound on open connections
    pub max_connections: u32,
    /// How long an operation waits for a free connection
    pub acquire_timeout: Duration,
    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://.notesphere-data/notesphere.db".to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Config for a database file at the given path
    pub fn for_file(path: impl AsRef<Path>) -> Self {
        Self {
            url: format!("sqlite://{}", path.as_ref().display()),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Gateway to the relational store
#[derive(Clone)]
pub struct StoreGateway {
    pool: SqlitePool,
}

impl StoreGateway {
    /// Open the pool and bootstrap the schema
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        debug!("Opening store at {}", config.url);

        if let Some(parent) = sqlite_file_parent(&config.url) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        let gateway = Self { pool };
        gateway.migrate().await?;

        info!(
            "Store ready ({} max connections)",
            config.max_connections.max(1)
        );
        Ok(gateway)
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        let mut tx = self.begin_write().await?;
        for statement in schema::STATEMENTS {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        debug!("Schema bootstrap complete");
        Ok(())
    }

    /// Begin a transaction on a pooled connection
    ///
    /// The connection returns to the pool when the transaction is
    /// committed, rolled back or dropped.
    pub async fn begin(&self) -> Result<Tx> {
        Ok(self.pool.begin().await?)
    }

    /// Begin a transaction that takes the write lock up front.
    ///
    /// A deferred transaction that reads before writing fails with
    /// `SQLITE_BUSY` once another writer commits after its read; an
    /// immediate one waits on `busy_timeout` for the lock instead.
    pub async fn begin_write(&self) -> Result<Tx> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Pool for single-statement reads outside a transaction
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn sqlite_file_parent(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// A gateway over a fresh database file inside a temp dir
    pub async fn create_test_gateway() -> (StoreGateway, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::for_file(temp_dir.path().join("notesphere.db"))
            .with_max_connections(4);
        let gateway = StoreGateway::connect(&config).await.unwrap();
        (gateway, temp_dir)
    }
}
