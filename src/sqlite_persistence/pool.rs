//! Pooled SQLite connections on top of r2d2.
//!
//! Connections are opened on demand up to `max_size`. Borrowing blocks while the
//! pool is exhausted; the returned guard gives the connection back when dropped.

use r2d2::ManageConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Params, Row};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("timed out after {0:?} waiting for a database connection: {1}")]
    Timeout(Duration, #[source] r2d2::Error),

    #[error("failed to open database connection: {0}")]
    Open(#[from] rusqlite::Error),

    #[error("failed to build connection pool: {0}")]
    Build(#[source] r2d2::Error),
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub db_path: PathBuf,
    pub max_size: u32,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            max_size: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout.max(MIN_ACQUIRE_TIMEOUT);
        self
    }
}

/// Applied to every new connection before it enters the pool.
fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("Initialized connection (journal_mode={})", journal_mode);
    Ok(())
}

/// Cheaply clonable handle to the connection pool.
#[derive(Clone)]
pub struct DbPool {
    pool: r2d2::Pool<SqliteConnectionManager>,
    acquire_timeout: Duration,
}

impl DbPool {
    /// Builds the pool. One connection is opened up front so a bad path fails at startup.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager = SqliteConnectionManager::file(&config.db_path).with_init(init_connection);
        manager.connect()?;

        let pool = r2d2::Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(0))
            .connection_timeout(config.acquire_timeout)
            .build(manager)
            .map_err(PoolError::Build)?;
        debug!(
            "Opened database pool at {:?} (max {} connections)",
            config.db_path, config.max_size
        );
        Ok(Self {
            pool,
            acquire_timeout: config.acquire_timeout,
        })
    }

    pub fn max_size(&self) -> u32 {
        self.pool.max_size()
    }

    /// Number of connections currently opened, idle or borrowed.
    pub fn open_connections(&self) -> u32 {
        self.pool.state().connections
    }

    /// Borrows a connection, waiting up to the configured acquire timeout.
    pub fn get(&self) -> Result<PooledConnection, PoolError> {
        let conn = self.pool.get().map_err(|err| {
            warn!(
                "Database pool exhausted ({} connections), gave up waiting",
                self.open_connections()
            );
            PoolError::Timeout(self.acquire_timeout, err)
        })?;
        Ok(PooledConnection {
            conn,
            borrowed_at: Instant::now(),
        })
    }

    /// Runs a statement that does not return rows, returns the number of changed rows.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> anyhow::Result<usize> {
        let conn = self.get()?;
        let start = Instant::now();
        let changed = conn.execute(sql, params)?;
        log_query(sql, start.elapsed(), changed);
        Ok(changed)
    }

    /// Runs a query and maps every row.
    pub fn query_rows<T, P, F>(&self, sql: &str, params: P, map: F) -> anyhow::Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.get()?;
        let start = Instant::now();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        log_query(sql, start.elapsed(), rows.len());
        Ok(rows)
    }

    /// Runs a query expected to return at most one row.
    pub fn query_optional<T, P, F>(&self, sql: &str, params: P, map: F) -> anyhow::Result<Option<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut rows = self.query_rows(sql, params, map)?;
        if rows.len() > 1 {
            anyhow::bail!("Expected at most one row, got {}", rows.len());
        }
        Ok(rows.pop())
    }
}

pub(crate) fn log_query(sql: &str, duration: Duration, rows: usize) {
    debug!(
        sql = sql,
        duration_ms = duration.as_secs_f64() * 1000.0,
        rows = rows,
        "Executed query"
    );
}

/// A borrowed connection. Returns to the pool on drop.
pub struct PooledConnection {
    conn: r2d2::PooledConnection<SqliteConnectionManager>,
    borrowed_at: Instant,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        debug!(
            "Connection released back to pool after {}ms",
            self.borrowed_at.elapsed().as_millis()
        );
    }
}
