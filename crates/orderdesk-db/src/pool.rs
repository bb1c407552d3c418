//! Pooled SQLite connections for the conversation log.

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on open connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Pool handed to request handlers and the conversation sink.
pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Applies the per-connection pragmas every time the pool opens a connection.
#[derive(Debug, Clone, Copy)]
struct ConversationLogPragmas {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<Connection, rusqlite::Error> for ConversationLogPragmas {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        require_wal(conn)?;
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
    }
}

/// Switches the connection to WAL. `:memory:` databases answer "memory",
/// which is accepted.
fn require_wal(conn: &Connection) -> Result<(), rusqlite::Error> {
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    match mode.as_str() {
        "wal" | "memory" => Ok(()),
        other => Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode stayed {other:?} instead of wal")),
        )),
    }
}

/// Opens (creating if needed) the conversation log at `db_path`.
///
/// `db_path` may be `:memory:`; every pooled connection then gets its own
/// private database, so tests use a pool size of 1.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path).with_flags(
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
    );

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .connection_customizer(Box::new(ConversationLogPragmas {
            busy_timeout_ms: settings.busy_timeout_ms,
        }))
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        max_size = settings.pool_max_size,
        "database pool ready"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragmas_apply_to_pooled_connections() {
        let pool = create_pool(
            ":memory:",
            DbRuntimeSettings {
                busy_timeout_ms: 2_500,
                pool_max_size: 1,
            },
        )
        .expect("pool creation should succeed");
        let conn = pool.get().expect("should get a connection");

        let fk: i32 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .expect("should query foreign_keys");
        assert_eq!(fk, 1);

        let busy_timeout: i32 = conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .expect("should query busy_timeout");
        assert_eq!(busy_timeout, 2_500);
        assert_eq!(pool.max_size(), 1);
    }
}
