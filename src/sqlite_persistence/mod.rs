mod migrations;
mod pool;

pub use migrations::{BatchState, Migration, MigrationError, MigrationReport, MigrationRunner};
pub use pool::{DbPool, PoolConfig, PoolError, PooledConnection};

/// Current unix time in seconds, as stored in every timestamp column.
pub fn now_unix_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Returns the `table.column` named by a UNIQUE constraint failure, if that is what `err` is.
pub fn unique_violation_column(err: &anyhow::Error) -> Option<String> {
    let sqlite_err = err.chain().find_map(|e| e.downcast_ref::<rusqlite::Error>())?;
    match sqlite_err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            message
                .strip_prefix("UNIQUE constraint failed: ")
                .map(|columns| columns.to_string())
        }
        _ => None,
    }
}
